use std::collections::HashSet;

use log::debug;

use crate::{
    collectors::{
        DefaultInterfaceImplementationCollector, DefinesAnyDefaultInterfaceMembersCollector,
        DefinesAnyRefFieldsCollector, DefinesAnyRefStructsCollector,
        DefinesAnyVirtualStaticInterfaceMembersCollector, DerivesFromCollector,
        ExceptionCollector, FeatureUsage, FieldAccessCollector, Incremental,
        TargetFrameworkCollector, UsageCollector, UsesNullableReferenceTypesCollector,
    },
    crawler::AssemblyContext,
    metadata::reader::ModuleReader,
    Result,
};

/// The facts of one collector, with the identity they are stored under.
#[derive(Debug, Clone, Copy)]
pub struct CollectorResult<'a> {
    /// [`UsageCollector::name`]
    pub name: &'static str,
    /// [`UsageCollector::version_required`]
    pub version: u32,
    /// The facts found.
    pub features: &'a HashSet<FeatureUsage>,
}

/// Runs a list of collectors over one module.
///
/// A set is single-use like the collectors it holds: create a fresh one per module.
pub struct UsageCollectorSet {
    collectors: Vec<Box<dyn UsageCollector>>,
}

impl Default for UsageCollectorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageCollectorSet {
    /// A set with every collector of this crate.
    #[must_use]
    pub fn new() -> Self {
        UsageCollectorSet::empty()
            .with(Incremental::<DefaultInterfaceImplementationCollector>::new())
            .with(Incremental::<DefinesAnyDefaultInterfaceMembersCollector>::new())
            .with(Incremental::<DefinesAnyRefFieldsCollector>::new())
            .with(Incremental::<DefinesAnyRefStructsCollector>::new())
            .with(Incremental::<DefinesAnyVirtualStaticInterfaceMembersCollector>::new())
            .with(Incremental::<DerivesFromCollector>::new())
            .with(Incremental::<ExceptionCollector>::new())
            .with(Incremental::<FieldAccessCollector>::new())
            .with(Incremental::<TargetFrameworkCollector>::new())
            .with(Incremental::<UsesNullableReferenceTypesCollector>::new())
    }

    /// A set without collectors.
    #[must_use]
    pub fn empty() -> Self {
        UsageCollectorSet {
            collectors: Vec::new(),
        }
    }

    /// Adds a collector, run after the ones already present.
    #[must_use]
    pub fn with(mut self, collector: impl UsageCollector + 'static) -> Self {
        self.collectors.push(Box::new(collector));
        self
    }

    /// Number of collectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    /// Returns `true` if the set has no collectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Runs every collector over `reader`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first collector error; the collectors after it don't run.
    pub fn collect(&mut self, reader: &ModuleReader, assembly: &AssemblyContext) -> Result<()> {
        for collector in &mut self.collectors {
            collector.collect(reader, assembly)?;
            debug!(
                "{} v{}: {} features",
                collector.name(),
                collector.version_required(),
                collector.results().len()
            );
        }

        Ok(())
    }

    /// The results of every collector, in order.
    pub fn results(&self) -> impl Iterator<Item = CollectorResult<'_>> {
        self.collectors.iter().map(|collector| CollectorResult {
            name: collector.name(),
            version: collector.version_required(),
            features: collector.results(),
        })
    }
}
