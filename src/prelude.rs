//! # usagescope Prelude
//!
//! The types needed to read a module, crawl it and run the usage collectors over it.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all usagescope operations
pub use crate::Error;

/// The result type used throughout usagescope
pub use crate::Result;

// ================================================================================================
// Reading Modules
// ================================================================================================

/// Entry point for reading a module
pub use crate::metadata::reader::ModuleReader;

/// Non-fatal anomalies found while reading
pub use crate::metadata::diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics,
};

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;

/// Rows of the tables the crawler walks
pub use crate::metadata::tables::{
    AssemblyRaw, AssemblyRefRaw, CodedIndex, EventRaw, FieldRaw, MemberRefRaw, MethodDefRaw,
    PropertyRaw, TableId, TypeDefRaw, TypeRefRaw, TypeSpecRaw,
};

/// Signature decoding
pub use crate::metadata::signatures::{DocIdProvider, SignatureDecoder, SignatureTypeProvider};

/// Enum resolution for custom attribute values
pub use crate::metadata::customattributes::{EnumResolver, NamedArguments};

/// Bytecode walking
pub use crate::disassembler::{Instructions, OpCode};

// ================================================================================================
// Crawling
// ================================================================================================

/// The module crawler and its results
pub use crate::crawler::{
    ApiKey, ApiKind, AssemblyContext, AssemblyCrawler, CrawlOptions, CrawlerResults,
    TargetFramework,
};

/// Usage collectors
pub use crate::collectors::{
    FeatureUsage, IncrementalUsageCollector, UsageCollector, UsageCollectorSet,
};

/// Packages
pub use crate::package::{DirectoryPackage, Package, PackageCrawler, PackageIdentity};
