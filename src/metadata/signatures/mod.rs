//! Signature blob decoding for ECMA-335 metadata (II.23.2).
//!
//! Signatures encode types, fields and methods in a compact prefix form: a header byte,
//! compressed counts, element type bytes and compressed `TypeDefOrRef` tokens. The
//! [`SignatureDecoder`] walks a blob and hands each shape to a [`SignatureTypeProvider`], which
//! decides what a type becomes. [`DocIdProvider`] is the provider used by the crawler: it
//! renders every type in documentation-ID notation.
//!
//! # Examples
//!
//! ```rust
//! use usagescope::metadata::signatures::{SignatureDecoder, StringTestProvider};
//!
//! // List<int32[]>, where List is TypeRef row 1
//! let mut provider = StringTestProvider;
//! let rendered = SignatureDecoder::new(&[0x15, 0x12, 0x05, 0x01, 0x1D, 0x08], &mut provider)
//!     .decode_type()?;
//! assert_eq!(rendered, "ref(0x01000001)<Int32[]>");
//! # Ok::<(), usagescope::Error>(())
//! ```
//!
//! # References
//!
//! - ECMA-335 6th Edition, Partition II, Section 23.2 - Blobs and Signatures

mod decoder;
mod docid;
mod types;

pub use decoder::{SignatureDecoder, SignatureTypeProvider, StringTestProvider, MAX_RECURSION_DEPTH};
pub use docid::DocIdProvider;
pub use types::*;
