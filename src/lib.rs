// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # usagescope
//!
//! Finds out which platform APIs a .NET module uses, without loading it.
//!
//! `usagescope` reads the ECMA-335 metadata of a managed PE module and reports every type,
//! method, field, property and event it references outside of itself, each as a
//! documentation ID (`T:System.String`, `M:System.Console.WriteLine(System.String)`). Next to
//! that, a set of small usage collectors answers narrower questions: which types does the
//! module derive from, which exceptions does it throw, does it define `ref` fields, which
//! framework does it target.
//!
//! ## Features
//!
//! - **Module reader** - bounds-checked access to the CLR header, metadata root, heaps and
//!   tables of a memory buffer or a memory-mapped file
//! - **Documentation IDs** - signature blobs decoded straight into their canonical names
//! - **Custom attributes** - named arguments of attribute value blobs, including enums of
//!   other assemblies through a pluggable resolver
//! - **Bytecode walking** - the metadata tokens a method body touches, without a full
//!   disassembly
//! - **Packages** - every module of an extracted NuGet package, crawled in parallel
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use usagescope::prelude::*;
//!
//! let reader = ModuleReader::from_file("Library.dll".as_ref())?;
//! let context = AssemblyContext::default();
//!
//! let apis = AssemblyCrawler::new().crawl(&reader, &context)?;
//! println!("{} APIs referenced", apis.len());
//!
//! let mut collectors = UsageCollectorSet::new();
//! collectors.collect(&reader, &context)?;
//! for result in collectors.results() {
//!     println!("{}: {} facts", result.name, result.features.len());
//! }
//! # Ok::<(), usagescope::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result`]. Damage that makes a module unreadable fails
//! [`ModuleReader::open`](metadata::reader::ModuleReader::open), and malformed tables,
//! signatures or attribute blobs fail the crawl of that module. A method body that doesn't
//! decode, or an enum that can't be resolved, is recorded in the reader's
//! [`Diagnostics`](metadata::diagnostics::Diagnostics) and the rest of the module is
//! processed as usual.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-, integration-tests and benchmarks
#[doc(hidden)]
pub mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use usagescope::prelude::*;
///
/// let reader = ModuleReader::from_file("Library.dll".as_ref())?;
/// for typedef in reader.type_defs().iter() {
///     let typedef = typedef?;
///     println!("{}", reader.string(typedef.type_name)?);
/// }
/// # Ok::<(), usagescope::Error>(())
/// ```
pub mod prelude;

/// PE container access through memory buffers or memory-mapped files.
pub mod file;

/// CIL bytecode walking based on ECMA-335 Partition III.
///
/// See [`disassembler::Instructions`] for the iterator and [`disassembler::OpCode`] for the
/// opcode table.
pub mod disassembler;

/// ECMA-335 metadata: the module reader, heaps, tables, signatures and custom attributes.
pub mod metadata;

/// The module crawler, producing documentation IDs of every referenced API.
pub mod crawler;

/// Usage collectors: single-purpose detectors over one module.
pub mod collectors;

/// NuGet packages as a source of modules.
pub mod package;

/// `usagescope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `usagescope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use usagescope::{metadata::reader::ModuleReader, Error};
///
/// match ModuleReader::from_file(std::path::Path::new("native.dll")) {
///     Ok(_) => println!("Loaded successfully"),
///     Err(Error::NotAModule(reason)) => println!("Not a managed module: {reason}"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {message}"),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;

/// Low-level parsing of little-endian data and compressed integers.
pub use file::{parser::Parser, File};
