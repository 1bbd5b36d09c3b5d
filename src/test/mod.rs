//! Shared functionality for unit tests, integration tests and benchmarks.
//!
//! [`ModuleBuilder`] writes small but complete managed modules, so tests can describe the
//! metadata they need instead of shipping binaries.

mod builder;

pub use builder::ModuleBuilder;
