//! Metadata streams.
//!
//! The metadata root is followed by a directory of named streams. The crate reads four of
//! them: the `#~` tables stream (through [`TablesHeader`]), and the `#Strings`, `#Blob` and
//! `#GUID` heaps. The heap types are cheap borrowed views, created on demand by
//! [`crate::metadata::reader::ModuleReader`].

mod blob;
mod guid;
mod streamheader;
mod strings;
mod tablesheader;

pub use blob::Blob;
pub use guid::Guid;
pub use streamheader::StreamHeader;
pub use strings::Strings;
pub use tablesheader::TablesHeader;
