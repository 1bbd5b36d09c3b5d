//! Exception handling clauses of a method body (II.25.4.6).

use bitflags::bitflags;

use crate::metadata::token::Token;

bitflags! {
    /// Exception handler flags defining the type of exception handling clause.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause.
        ///
        /// The `class_token` field contains the metadata token of the exception type
        /// that this handler catches.
        const EXCEPTION = 0x0000;

        /// An exception filter and handler clause.
        const FILTER = 0x0001;

        /// A finally clause.
        const FINALLY = 0x0002;

        /// A fault clause (finally that executes only on exception).
        const FAULT = 0x0004;
    }
}

/// One exception handling clause of a method body.
///
/// ```text
/// try {
///     // try_offset -> try_offset + try_length
/// }
/// catch (class_token) {
///     // handler_offset -> handler_offset + handler_length
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Flags describing the type of exception handler (catch, filter, finally, fault).
    pub flags: ExceptionHandlerFlags,
    /// Offset in bytes of try block from start of method body.
    pub try_offset: u32,
    /// Length in bytes of the try block.
    pub try_length: u32,
    /// Location of the handler for this try block.
    pub handler_offset: u32,
    /// Size of the handler code in bytes.
    pub handler_length: u32,
    /// The raw class-token-or-filter-offset field.
    ///
    /// For typed clauses this is the caught type, see [`ExceptionHandler::class_token`].
    pub class_token_or_filter: u32,
}

impl ExceptionHandler {
    /// Returns `true` for a typed catch clause.
    #[must_use]
    pub fn is_catch(&self) -> bool {
        !self.flags.intersects(
            ExceptionHandlerFlags::FILTER
                | ExceptionHandlerFlags::FINALLY
                | ExceptionHandlerFlags::FAULT,
        )
    }

    /// The caught type of a typed catch clause, `None` for every other clause.
    #[must_use]
    pub fn class_token(&self) -> Option<Token> {
        if self.is_catch() {
            Some(Token::new(self.class_token_or_filter))
        } else {
            None
        }
    }

    /// The filter start of a filter clause.
    #[must_use]
    pub fn filter_offset(&self) -> Option<u32> {
        if self.flags.contains(ExceptionHandlerFlags::FILTER) {
            Some(self.class_token_or_filter)
        } else {
            None
        }
    }
}
