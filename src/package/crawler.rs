use std::{collections::HashSet, fmt, sync::Arc};

use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    collectors::{FeatureUsage, UsageCollectorSet},
    crawler::{AssemblyContext, AssemblyCrawler, CrawlOptions, CrawlerResults, TargetFramework},
    metadata::reader::ModuleReader,
    package::{Package, PackageIdentity},
    Error, Result,
};

/// Why a file of a package contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file is empty.
    Empty,
    /// The file is not a managed assembly.
    NotAModule(String),
    /// Reading or crawling the module failed.
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Empty => f.write_str("empty file"),
            SkipReason::NotAModule(reason) => write!(f, "not a managed assembly: {reason}"),
            SkipReason::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// A file of a package that was considered but not merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    /// Path inside the package.
    pub path: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// The merged facts of one collector over all modules of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorFeatures {
    /// Collector name.
    pub name: &'static str,
    /// Collector version.
    pub version: u32,
    /// Union of the facts of every module.
    pub features: HashSet<FeatureUsage>,
}

/// Everything found in one package.
#[derive(Debug, Clone)]
pub struct PackageResults {
    /// The package.
    pub identity: PackageIdentity,
    /// Paths of the modules whose results were merged, sorted.
    pub modules: Vec<String>,
    /// Union of the API keys of every module.
    pub api_keys: CrawlerResults,
    /// Facts per collector, in the order of [`UsageCollectorSet::new`].
    pub features: Vec<CollectorFeatures>,
    /// Files that were considered but contributed nothing, sorted by path.
    pub skipped: Vec<SkippedFile>,
}

impl PackageResults {
    fn new(identity: PackageIdentity) -> Self {
        let features = UsageCollectorSet::new()
            .results()
            .map(|result| CollectorFeatures {
                name: result.name,
                version: result.version,
                features: HashSet::new(),
            })
            .collect();

        PackageResults {
            identity,
            modules: Vec::new(),
            api_keys: CrawlerResults::default(),
            features,
            skipped: Vec::new(),
        }
    }

    /// The merged facts of the collector named `name`.
    #[must_use]
    pub fn features_of(&self, name: &str) -> Option<&HashSet<FeatureUsage>> {
        self.features
            .iter()
            .find(|collector| collector.name == name)
            .map(|collector| &collector.features)
    }

    fn merge(&mut self, module: ModuleResults) {
        self.modules.push(module.path);
        self.api_keys.merge(module.api_keys);

        for (name, features) in module.features {
            if let Some(merged) = self.features.iter_mut().find(|merged| merged.name == name) {
                merged.features.extend(features);
            }
        }
    }
}

/// The results of one module of a package.
struct ModuleResults {
    path: String,
    api_keys: CrawlerResults,
    features: Vec<(&'static str, HashSet<FeatureUsage>)>,
}

/// Crawls every module of a package.
///
/// Modules are crawled in parallel on the `rayon` thread pool. A module that fails is logged
/// and listed in [`PackageResults::skipped`]; it never fails the package.
#[derive(Debug, Clone, Default)]
pub struct PackageCrawler {
    options: CrawlOptions,
}

impl PackageCrawler {
    /// A crawler with [`CrawlOptions::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A crawler whose module crawls use `options`.
    #[must_use]
    pub fn with_options(options: CrawlOptions) -> Self {
        PackageCrawler { options }
    }

    /// Crawls the `.dll` and `.exe` files under `lib/` and `runtimes/` of `package`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the package's file list can't be read.
    pub fn crawl(&self, package: Arc<dyn Package>) -> Result<PackageResults> {
        let mut candidates: Vec<String> = package
            .files()?
            .into_iter()
            .filter(|path| is_candidate(path))
            .collect();
        candidates.sort();

        debug!(
            "{}: crawling {} candidate files",
            package.identity(),
            candidates.len()
        );

        let outcomes: Vec<std::result::Result<ModuleResults, SkippedFile>> = candidates
            .par_iter()
            .map(|path| self.crawl_file(&package, path))
            .collect();

        let mut results = PackageResults::new(package.identity().clone());
        for outcome in outcomes {
            match outcome {
                Ok(module) => results.merge(module),
                Err(skipped) => {
                    warn!(
                        "{}: skipping '{}': {}",
                        results.identity, skipped.path, skipped.reason
                    );
                    results.skipped.push(skipped);
                }
            }
        }

        Ok(results)
    }

    fn crawl_file(
        &self,
        package: &Arc<dyn Package>,
        path: &str,
    ) -> std::result::Result<ModuleResults, SkippedFile> {
        let skip = |reason: SkipReason| SkippedFile {
            path: path.to_string(),
            reason,
        };

        let data = package
            .read(path)
            .map_err(|error| skip(SkipReason::Failed(error.to_string())))?;
        if data.is_empty() {
            return Err(skip(SkipReason::Empty));
        }

        let reader = ModuleReader::open(data).map_err(|error| match error {
            Error::NotAModule(reason) => skip(SkipReason::NotAModule(reason)),
            Error::GoblinErr(_) | Error::Empty => skip(SkipReason::NotAModule(error.to_string())),
            error => skip(SkipReason::Failed(error.to_string())),
        })?;

        let context = AssemblyContext {
            package: Some(Arc::clone(package)),
            framework: framework_of_path(path),
        };

        let api_keys = AssemblyCrawler::with_options(self.options.clone())
            .crawl(&reader, &context)
            .map_err(|error| skip(SkipReason::Failed(error.to_string())))?;

        let mut collectors = UsageCollectorSet::new();
        collectors
            .collect(&reader, &context)
            .map_err(|error| skip(SkipReason::Failed(error.to_string())))?;

        for diagnostic in reader.diagnostics().iter() {
            debug!("{path}: {diagnostic}");
        }

        Ok(ModuleResults {
            path: path.to_string(),
            api_keys,
            features: collectors
                .results()
                .map(|result| (result.name, result.features.clone()))
                .collect(),
        })
    }
}

fn is_candidate(path: &str) -> bool {
    (path.starts_with("lib/") || path.starts_with("runtimes/"))
        && (path.ends_with(".dll") || path.ends_with(".exe"))
}

/// The framework named by the folder of `lib/<tfm>/...` style paths.
fn framework_of_path(path: &str) -> Option<TargetFramework> {
    let segments: Vec<&str> = path
        .split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() < 3 {
        return None;
    }

    TargetFramework::parse(segments[1])
}
