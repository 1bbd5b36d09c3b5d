use std::{fmt, sync::Arc};

use crate::{crawler::TargetFramework, package::Package};

/// What the caller knows about a module beyond its bytes.
///
/// Both parts are optional; [`AssemblyContext::default`] knows nothing.
#[derive(Clone, Default)]
pub struct AssemblyContext {
    /// The package the module was taken from.
    pub package: Option<Arc<dyn Package>>,
    /// The framework the module targets, typically from its `lib/<tfm>/` folder.
    pub framework: Option<TargetFramework>,
}

impl AssemblyContext {
    /// A context with only a known framework.
    #[must_use]
    pub fn for_framework(framework: TargetFramework) -> Self {
        AssemblyContext {
            package: None,
            framework: Some(framework),
        }
    }

    /// Attaches the containing package.
    #[must_use]
    pub fn with_package(mut self, package: Arc<dyn Package>) -> Self {
        self.package = Some(package);
        self
    }
}

impl fmt::Debug for AssemblyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblyContext")
            .field(
                "package",
                &self.package.as_ref().map(|package| package.identity().to_string()),
            )
            .field("framework", &self.framework)
            .finish()
    }
}
