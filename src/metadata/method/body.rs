//! Method body headers and exception handling sections (II.25.4).
//!
//! A body starts at the RVA of its `MethodDef` row with either a one-byte tiny header or a
//! twelve-byte fat header. Fat bodies may be followed by 4-byte aligned extra data sections
//! which hold the exception handling clauses, in small or fat form.

use crate::{
    file::parser::Parser,
    metadata::method::{ExceptionHandler, ExceptionHandlerFlags, MethodBodyFlags, SectionFlags},
    Result,
};

const FAT_HEADER_SIZE: usize = 12;
const SMALL_CLAUSE_SIZE: usize = 12;
const FAT_CLAUSE_SIZE: usize = 24;

/// The decoded body of one method, borrowing its bytecode from the image.
#[derive(Debug, Clone)]
pub struct MethodBody<'a> {
    /// The CIL bytecode, without header and extra sections
    pub code: &'a [u8],
    /// Size of the method header in bytes
    pub size_header: usize,
    /// `StandAloneSig` token of the local variable signature, 0 if there are no locals
    pub local_var_sig_token: u32,
    /// Maximum number of items on the operand stack
    pub max_stack: usize,
    /// Flag, indicating the type of the method header
    pub is_fat: bool,
    /// Flag, indicating to call default constructor on all local variables
    pub is_init_local: bool,
    /// The exception handling clauses, in declaration order
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl<'a> MethodBody<'a> {
    /// Decodes the method body starting at the first byte of `data`.
    ///
    /// `data` may extend past the end of the body.
    ///
    /// # Errors
    /// Returns an error if the data is empty, truncated, or the header is neither tiny nor fat.
    pub fn from(data: &'a [u8]) -> Result<MethodBody<'a>> {
        if data.is_empty() {
            return Err(malformed_error!("Provided data for body parsing is empty"));
        }

        let mut parser = Parser::new(data);
        let first_byte = parser.peek_byte()?;

        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b_0000_0011)) {
            MethodBodyFlags::TINY_FORMAT => {
                parser.advance_by(1)?;
                let code = parser.read_bytes((first_byte >> 2) as usize)?;

                Ok(MethodBody {
                    code,
                    size_header: 1,
                    local_var_sig_token: 0,
                    max_stack: 8,
                    is_fat: false,
                    is_init_local: false,
                    exception_handlers: Vec::new(),
                })
            }
            MethodBodyFlags::FAT_FORMAT => {
                let first_duo = parser.read_le::<u16>()?;
                let max_stack = parser.read_le::<u16>()? as usize;
                let size_code = parser.read_le::<u32>()? as usize;
                let local_var_sig_token = parser.read_le::<u32>()?;

                let size_header = ((first_duo >> 12) as usize) * 4;
                if size_header < FAT_HEADER_SIZE {
                    return Err(malformed_error!(
                        "Fat method header claims {} bytes",
                        size_header
                    ));
                }

                parser.seek(size_header)?;
                let code = parser.read_bytes(size_code)?;

                let flags_header = MethodBodyFlags::from_bits_truncate(first_duo & 0x0FFF);
                let exception_handlers = if flags_header.contains(MethodBodyFlags::MORE_SECTS) {
                    parser.align(4)?;
                    read_sections(&mut parser)?
                } else {
                    Vec::new()
                };

                Ok(MethodBody {
                    code,
                    size_header,
                    local_var_sig_token,
                    max_stack,
                    is_fat: true,
                    is_init_local: flags_header.contains(MethodBodyFlags::INIT_LOCALS),
                    exception_handlers,
                })
            }
            _ => Err(malformed_error!(
                "MethodHeader is neither FAT nor TINY - {}",
                first_byte
            )),
        }
    }

    /// Size of header plus code in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.code.len() + self.size_header
    }
}

fn read_sections(parser: &mut Parser<'_>) -> Result<Vec<ExceptionHandler>> {
    let mut handlers = Vec::new();

    loop {
        let section_start = parser.pos();
        let flags = SectionFlags::from_bits_truncate(parser.read_le::<u8>()?);

        let (section_size, clause_size) = if flags.contains(SectionFlags::FAT_FORMAT) {
            let low = parser.read_le::<u16>()? as usize;
            let high = parser.read_le::<u8>()? as usize;
            (low | (high << 16), FAT_CLAUSE_SIZE)
        } else {
            let size = parser.read_le::<u8>()? as usize;
            parser.advance_by(2)?;
            (size, SMALL_CLAUSE_SIZE)
        };

        if section_size < 4 {
            return Err(malformed_error!(
                "Method data section of {} bytes",
                section_size
            ));
        }

        if flags.contains(SectionFlags::EHTABLE) {
            for _ in 0..(section_size - 4) / clause_size {
                handlers.push(if clause_size == FAT_CLAUSE_SIZE {
                    read_fat_clause(parser)?
                } else {
                    read_small_clause(parser)?
                });
            }
        }

        if !flags.contains(SectionFlags::MORE_SECTS) {
            break;
        }

        let next = section_start
            .checked_add(section_size)
            .ok_or_else(|| out_of_bounds_error!())?;
        parser.seek(next)?;
        parser.align(4)?;
    }

    Ok(handlers)
}

fn read_small_clause(parser: &mut Parser<'_>) -> Result<ExceptionHandler> {
    Ok(ExceptionHandler {
        flags: ExceptionHandlerFlags::from_bits_truncate(parser.read_le::<u16>()?),
        try_offset: u32::from(parser.read_le::<u16>()?),
        try_length: u32::from(parser.read_le::<u8>()?),
        handler_offset: u32::from(parser.read_le::<u16>()?),
        handler_length: u32::from(parser.read_le::<u8>()?),
        class_token_or_filter: parser.read_le::<u32>()?,
    })
}

fn read_fat_clause(parser: &mut Parser<'_>) -> Result<ExceptionHandler> {
    // Only the low 16 bits carry defined flags
    #[allow(clippy::cast_possible_truncation)]
    let flags = ExceptionHandlerFlags::from_bits_truncate(parser.read_le::<u32>()? as u16);

    Ok(ExceptionHandler {
        flags,
        try_offset: parser.read_le::<u32>()?,
        try_length: parser.read_le::<u32>()?,
        handler_offset: parser.read_le::<u32>()?,
        handler_length: parser.read_le::<u32>()?,
        class_token_or_filter: parser.read_le::<u32>()?,
    })
}
