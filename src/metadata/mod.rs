//! ECMA-335 metadata of a managed module.
//!
//! [`reader::ModuleReader`] opens a module and validates its CLR header, metadata root and
//! table stream. Everything else in this module works on top of it:
//!
//! - [`tables`] - typed, lazily decoded rows of the metadata tables
//! - [`streams`] - the `#Strings`, `#Blob`, `#GUID` heaps and the tables header
//! - [`method`] - method body headers and exception handling clauses
//! - [`signatures`] - signature blob decoding and documentation-ID rendering
//! - [`naming`] - canonical names of references, the keys of the crawl
//! - [`customattributes`] - named arguments of custom attribute value blobs
//! - [`diagnostics`] - non-fatal anomalies collected while reading
//!
//! # Examples
//!
//! ```rust,no_run
//! use usagescope::metadata::{naming, reader::ModuleReader};
//! use std::path::Path;
//!
//! let reader = ModuleReader::from_file(Path::new("Library.dll"))?;
//! for typeref in reader.type_refs().iter() {
//!     if let Some(key) = naming::type_ref_doc_id(&reader, &typeref?)? {
//!         println!("{key}");
//!     }
//! }
//! # Ok::<(), usagescope::Error>(())
//! ```

/// Implementation of the Header of CIL
pub mod cor20header;
/// Named arguments of custom attribute values
pub mod customattributes;
/// Non-fatal anomalies of a module
pub mod diagnostics;
/// Method bodies and exception handlers
pub mod method;
/// Canonical names and documentation IDs
pub mod naming;
/// The module reader
pub mod reader;
/// Implementation of the root metadata structure
pub mod root;
/// Signature decoding
pub mod signatures;
/// Metadata streams and heaps
pub mod streams;
/// Metadata tables
pub mod tables;
/// Metadata tokens
pub mod token;
