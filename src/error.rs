use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Only two of these are meant to abort the crawl of a module: structural damage found while
/// opening it ([`Error::NotAModule`] and friends) and [`Error::RecursionLimit`]. Everything a
/// single method body or a single attribute blob can get wrong is contained where it happens.
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// This error indicates that the file structure is corrupted or doesn't
    /// conform to the expected .NET PE format. The error includes the source
    /// location where the malformation was detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    ///
    /// This error occurs when trying to read data beyond the end of the file
    /// or stream. It's a safety check to prevent buffer overruns during parsing.
    #[error("Out of Bound read would have occurred! - {file}:{line}")]
    OutOfBounds {
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The input is a valid PE file, but not a managed assembly.
    ///
    /// Returned when the image has no CLR header, no metadata, or metadata that
    /// does not declare an assembly (e.g. a netmodule).
    #[error("Not a managed assembly - {0}")]
    NotAModule(String),

    /// This file type is not supported.
    ///
    /// Indicates that the input uses metadata features this library does not
    /// understand, such as tables from a newer revision of the format.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// A token pointed at a row that does not exist, or at a table that can't hold it.
    #[error("Invalid token - {0}")]
    InvalidToken(Token),

    /// Recursion limit reached.
    ///
    /// Pathological or adversarial type nesting (generic instantiations wrapping each other,
    /// self-referencing type specifications) is cut off at a fixed depth. When this happens
    /// while crawling, the whole module is considered failed and no partial result is
    /// produced.
    ///
    /// The associated value shows the recursion limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// Error while reading a package manifest.
    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    /// Error while enumerating the files of a package folder.
    #[error("{0}")]
    WalkError(#[from] walkdir::Error),
}
