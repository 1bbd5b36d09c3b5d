//! Feature usage collectors.
//!
//! Where the [crawler](crate::crawler) answers "which APIs does this module reference", a
//! collector answers a narrower question about how the module uses the platform: does it
//! define `ref struct`s, which exceptions does it throw, which framework does it target. Each
//! collector is one detector with a version number; the version is part of the persisted
//! results and must be bumped whenever the detector's logic changes, so that stored facts
//! produced by an older detector can be recomputed.
//!
//! Most detectors only ever add facts to a set. They implement
//! [`IncrementalUsageCollector`] and are driven through [`Incremental`], which owns the set.
//! [`UsageCollectorSet`] runs every detector of this crate over one module.
//!
//! # Example
//!
//! ```rust,no_run
//! use usagescope::collectors::UsageCollectorSet;
//! use usagescope::crawler::AssemblyContext;
//! use usagescope::metadata::reader::ModuleReader;
//!
//! let reader = ModuleReader::from_file("Library.dll".as_ref())?;
//! let mut collectors = UsageCollectorSet::new();
//! collectors.collect(&reader, &AssemblyContext::default())?;
//!
//! for result in collectors.results() {
//!     for feature in result.features {
//!         println!("{} v{}: {feature}", result.name, result.version);
//!     }
//! }
//! # Ok::<(), usagescope::Error>(())
//! ```

mod derives;
mod exceptions;
mod feature;
mod fields;
mod framework;
mod interfaces;
mod nullable;
mod refs;
mod set;

pub use derives::DerivesFromCollector;
pub use exceptions::ExceptionCollector;
pub use feature::FeatureUsage;
pub use fields::FieldAccessCollector;
pub use framework::TargetFrameworkCollector;
pub use interfaces::{
    DefaultInterfaceImplementationCollector, DefinesAnyDefaultInterfaceMembersCollector,
    DefinesAnyVirtualStaticInterfaceMembersCollector,
};
pub use nullable::UsesNullableReferenceTypesCollector;
pub use refs::{DefinesAnyRefFieldsCollector, DefinesAnyRefStructsCollector};
pub use set::{CollectorResult, UsageCollectorSet};

use std::collections::HashSet;

use crate::{
    crawler::AssemblyContext,
    metadata::{
        reader::ModuleReader,
        signatures::{SignatureHeader, SignatureKind},
        tables::MemberRefRaw,
    },
    Result,
};

/// A stateful detector run once over one module.
///
/// Implementations must be `Send` so a collector can be created on one thread and run on a
/// worker.
pub trait UsageCollector: Send {
    /// Version of the detection logic. Results from a different version are not comparable.
    fn version_required(&self) -> u32;

    /// Name for logging and for keying stored results.
    fn name(&self) -> &'static str;

    /// Inspects `reader`. Called once per collector instance.
    ///
    /// # Errors
    ///
    /// Returns an error if metadata the detector needs is malformed.
    fn collect(&mut self, reader: &ModuleReader, assembly: &AssemblyContext) -> Result<()>;

    /// The facts found so far.
    fn results(&self) -> &HashSet<FeatureUsage>;
}

/// A detector that only ever adds facts.
///
/// Wrap it in [`Incremental`] to get a [`UsageCollector`].
pub trait IncrementalUsageCollector: Default + Send {
    /// Version of the detection logic.
    const VERSION_REQUIRED: u32;

    /// Name for logging and for keying stored results.
    const NAME: &'static str;

    /// Reports every fact of `reader` to `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if metadata the detector needs is malformed.
    fn collect_features(
        &self,
        reader: &ModuleReader,
        assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()>;
}

/// Receives the facts of one [`IncrementalUsageCollector`] run.
pub struct Context<'a> {
    receiver: &'a mut HashSet<FeatureUsage>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(receiver: &'a mut HashSet<FeatureUsage>) -> Self {
        Context { receiver }
    }

    /// Adds a fact; reporting the same fact twice keeps one.
    pub fn report(&mut self, feature: FeatureUsage) {
        self.receiver.insert(feature);
    }
}

/// Owns the result set of an [`IncrementalUsageCollector`].
#[derive(Debug, Default)]
pub struct Incremental<T> {
    detector: T,
    features: HashSet<FeatureUsage>,
}

impl<T: IncrementalUsageCollector> Incremental<T> {
    /// A collector with an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Incremental {
            detector: T::default(),
            features: HashSet::new(),
        }
    }

    /// Consumes the collector, returning its facts.
    #[must_use]
    pub fn into_results(self) -> HashSet<FeatureUsage> {
        self.features
    }
}

impl<T: IncrementalUsageCollector> UsageCollector for Incremental<T> {
    fn version_required(&self) -> u32 {
        T::VERSION_REQUIRED
    }

    fn name(&self) -> &'static str {
        T::NAME
    }

    fn collect(&mut self, reader: &ModuleReader, assembly: &AssemblyContext) -> Result<()> {
        let mut context = Context::new(&mut self.features);
        self.detector.collect_features(reader, assembly, &mut context)
    }

    fn results(&self) -> &HashSet<FeatureUsage> {
        &self.features
    }
}

/// Whether a member reference refers to a field rather than a method.
pub(crate) fn is_field_reference(reader: &ModuleReader, memberref: &MemberRefRaw) -> Result<bool> {
    let Some(header) = reader.blob(memberref.signature)?.first() else {
        return Err(malformed_error!(
            "MemberRef {} has an empty signature",
            memberref.token
        ));
    };

    Ok(SignatureHeader(*header).kind() == SignatureKind::Field)
}
