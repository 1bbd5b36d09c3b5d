//! CIL bytecode walking.
//!
//! The crawler never needs a full disassembly: it only wants to know which metadata entities a
//! method body touches and, for a handful of opcodes, what an instruction is. [`Instructions`]
//! walks a body linearly, skipping operands by their size from the opcode table and yielding the
//! token of every token-carrying instruction.
//!
//! # Example
//! ```rust
//! use usagescope::disassembler::{Instructions, OpCode};
//! use usagescope::metadata::token::Token;
//!
//! let code = [0x00, 0x28, 0x01, 0x00, 0x00, 0x0A, 0x2A]; // nop; call 0x0A000001; ret
//! let walked: Vec<_> = Instructions::new(&code).collect();
//! assert_eq!(walked[1], (OpCode::CALL, Some(Token::new(0x0A00_0001))));
//! assert_eq!(walked.len(), 3);
//! ```

mod iterator;
mod opcodes;

pub use iterator::Instructions;
pub use opcodes::{operand_size, OpCode, OperandKind};
