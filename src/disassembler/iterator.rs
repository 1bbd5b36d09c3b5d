use std::iter::FusedIterator;

use crate::{
    disassembler::opcodes::{OpCode, OperandKind},
    file::parser::Parser,
    metadata::token::Token,
    Result,
};

/// Forward-only walk over a method body's IL.
///
/// Yields each opcode together with its metadata token for the token-carrying opcodes. `switch`
/// is yielded with `None` after its jump table is skipped. An unknown opcode or a truncated
/// operand ends the walk; no error is surfaced because the collectors treat whatever was read so
/// far as the method's contents.
pub struct Instructions<'a> {
    parser: Parser<'a>,
    finished: bool,
}

impl<'a> Instructions<'a> {
    /// Walks `code`, which starts at the first instruction.
    #[must_use]
    pub fn new(code: &'a [u8]) -> Self {
        Instructions {
            parser: Parser::new(code),
            finished: false,
        }
    }

    fn read_opcode(&mut self) -> Result<OpCode> {
        let first = self.parser.read_le::<u8>()?;
        if first < 0xF0 {
            return Ok(OpCode(u16::from(first)));
        }

        let second = self.parser.read_le::<u8>()?;
        Ok(OpCode((u16::from(first) << 8) | u16::from(second)))
    }

    fn decode(&mut self) -> Result<Option<(OpCode, Option<Token>)>> {
        let opcode = self.read_opcode()?;
        let Some(operand) = opcode.operand() else {
            return Ok(None);
        };

        match operand {
            OperandKind::Token => {
                let token = Token::new(self.parser.read_le::<u32>()?);
                Ok(Some((opcode, Some(token))))
            }
            OperandKind::Switch => {
                let count = self.parser.read_le::<u32>()? as usize;
                let Some(table) = count.checked_mul(4) else {
                    return Ok(None);
                };
                self.parser.advance_by(table)?;
                Ok(Some((opcode, None)))
            }
            other => {
                self.parser.advance_by(other.size().unwrap_or(0))?;
                Ok(Some((opcode, None)))
            }
        }
    }
}

impl Iterator for Instructions<'_> {
    type Item = (OpCode, Option<Token>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || !self.parser.has_more_data() {
            return None;
        }

        match self.decode() {
            Ok(Some(item)) => Some(item),
            Ok(None) | Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}

impl FusedIterator for Instructions<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(code: &[u8]) -> Vec<(OpCode, Option<Token>)> {
        Instructions::new(code).collect()
    }

    #[test]
    fn tokens_and_plain_opcodes() {
        let code = [
            0x00, // nop
            0x7E, 0x01, 0x00, 0x00, 0x04, // ldsfld 0x04000001
            0x1F, 0x2A, // ldc.i4.s 42
            0x73, 0x05, 0x00, 0x00, 0x0A, // newobj 0x0A000005
            0x7A, // throw
            0x2A, // ret
        ];

        assert_eq!(
            walk(&code),
            vec![
                (OpCode::NOP, None),
                (OpCode::LDSFLD, Some(Token::new(0x0400_0001))),
                (OpCode::LDC_I4_S, None),
                (OpCode::NEWOBJ, Some(Token::new(0x0A00_0005))),
                (OpCode::THROW, None),
                (OpCode::RET, None),
            ]
        );
    }

    #[test]
    fn two_byte_opcodes() {
        let code = [
            0xFE, 0x06, 0x02, 0x00, 0x00, 0x06, // ldftn 0x06000002
            0xFE, 0x0C, 0x01, 0x00, // ldloc 1
            0xFE, 0x16, 0x03, 0x00, 0x00, 0x02, // constrained. 0x02000003
            0x21, 1, 2, 3, 4, 5, 6, 7, 8, // ldc.i8
            0x72, 0x01, 0x00, 0x00, 0x70, // ldstr
        ];

        assert_eq!(
            walk(&code),
            vec![
                (OpCode::LDFTN, Some(Token::new(0x0600_0002))),
                (OpCode::LDLOC, None),
                (OpCode::CONSTRAINED, Some(Token::new(0x0200_0003))),
                (OpCode::LDC_I8, None),
                (OpCode::LDSTR, None),
            ]
        );
    }

    #[test]
    fn switch_skips_jump_table() {
        let code = [
            0x45, 0x02, 0x00, 0x00, 0x00, // switch (2 targets)
            0x10, 0x00, 0x00, 0x00, 0x20, 0x00, 0x00, 0x00, //
            0x28, 0x07, 0x00, 0x00, 0x0A, // call 0x0A000007
        ];

        assert_eq!(
            walk(&code),
            vec![
                (OpCode::SWITCH, None),
                (OpCode::CALL, Some(Token::new(0x0A00_0007))),
            ]
        );
    }

    #[test]
    fn stops_at_unknown_or_truncated() {
        assert_eq!(walk(&[0x00, 0x24, 0x00]), vec![(OpCode::NOP, None)]);
        assert_eq!(walk(&[0x00, 0xFE, 0x08, 0x00]), vec![(OpCode::NOP, None)]);
        assert_eq!(walk(&[0x00, 0x28, 0x01, 0x00]), vec![(OpCode::NOP, None)]);
        assert_eq!(walk(&[0x45, 0xFF, 0xFF, 0xFF, 0xFF]), vec![]);
        assert_eq!(walk(&[0xFE]), vec![]);
        assert!(walk(&[]).is_empty());

        let mut instructions = Instructions::new(&[0x24, 0x00]);
        assert!(instructions.next().is_none());
        assert!(instructions.next().is_none());
    }
}
