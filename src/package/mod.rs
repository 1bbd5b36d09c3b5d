//! NuGet packages as a source of modules.
//!
//! A [`Package`] is a named, versioned set of files. [`PackageCrawler`] picks the modules out
//! of the `lib/` and `runtimes/` folders of one, crawls each of them with a fresh
//! [`AssemblyCrawler`](crate::crawler::AssemblyCrawler) and
//! [`UsageCollectorSet`](crate::collectors::UsageCollectorSet), and merges the results.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use usagescope::package::{DirectoryPackage, PackageCrawler};
//!
//! let package = DirectoryPackage::open("packages/newtonsoft.json.13.0.3".as_ref())?;
//! let results = PackageCrawler::new().crawl(Arc::new(package))?;
//!
//! println!("{}: {} APIs", results.identity, results.api_keys.len());
//! for skipped in &results.skipped {
//!     println!("skipped {}: {}", skipped.path, skipped.reason);
//! }
//! # Ok::<(), usagescope::Error>(())
//! ```

mod crawler;
mod directory;

pub use crawler::{CollectorFeatures, PackageCrawler, PackageResults, SkipReason, SkippedFile};
pub use directory::DirectoryPackage;

use std::fmt;

use crate::Result;

/// Id and version of a package, e.g. `Newtonsoft.Json 13.0.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageIdentity {
    /// The package id.
    pub id: String,
    /// The version text; empty if unknown.
    pub version: String,
}

impl PackageIdentity {
    /// Creates an identity.
    #[must_use]
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        PackageIdentity {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Splits a folder or file name such as `newtonsoft.json.13.0.3` into id and version.
    ///
    /// The version starts at the first dot-separated part that begins with a digit. Without
    /// one, the whole name is the id.
    #[must_use]
    pub fn from_folder_name(name: &str) -> Self {
        let split = name.match_indices('.').map(|(index, _)| index).find(|index| {
            name[index + 1..]
                .chars()
                .next()
                .is_some_and(|first| first.is_ascii_digit())
        });

        match split {
            Some(index) if index > 0 => PackageIdentity::new(&name[..index], &name[index + 1..]),
            _ => PackageIdentity::new(name, ""),
        }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            f.write_str(&self.id)
        } else {
            write!(f, "{} {}", self.id, self.version)
        }
    }
}

/// A package: an identity and a set of files.
///
/// Implementations are shared between the worker threads of a [`PackageCrawler`] and must be
/// `Send + Sync`.
pub trait Package: Send + Sync {
    /// Id and version.
    fn identity(&self) -> &PackageIdentity;

    /// Paths of all files, relative to the package root and separated by `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file list can't be read.
    fn files(&self) -> Result<Vec<String>>;

    /// Reads one file named by a path from [`Package::files`].
    ///
    /// # Errors
    ///
    /// Returns an error if the path isn't part of the package or can't be read.
    fn read(&self, path: &str) -> Result<Vec<u8>>;
}
