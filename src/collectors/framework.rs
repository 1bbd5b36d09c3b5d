use log::debug;

use crate::{
    collectors::{Context, FeatureUsage, IncrementalUsageCollector},
    crawler::{AssemblyContext, TargetFramework},
    metadata::{naming::target_framework_moniker, reader::ModuleReader, tables::AssemblyRefRaw},
    Result,
};

/// Public key token of the ECMA standard libraries (`mscorlib` of .NET Framework).
const ECMA_TOKEN: [u8; 8] = [0xB7, 0x7A, 0x5C, 0x56, 0x19, 0x34, 0xE0, 0x89];

/// Reports the framework the module targets.
///
/// The framework known from the package layout wins. Otherwise the module's
/// `TargetFrameworkAttribute` is used, and for modules without one (older compilers) the
/// framework is inferred from the version of the core library it references.
#[derive(Debug, Default)]
pub struct TargetFrameworkCollector;

impl IncrementalUsageCollector for TargetFrameworkCollector {
    const VERSION_REQUIRED: u32 = 5;
    const NAME: &'static str = "TargetFramework";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        let framework = match &assembly.framework {
            Some(framework) => Some(framework.clone()),
            None => infer_framework(reader)?,
        };

        if let Some(framework) = framework {
            context.report(FeatureUsage::TargetFramework(framework));
        }

        Ok(())
    }
}

fn infer_framework(reader: &ModuleReader) -> Result<Option<TargetFramework>> {
    match target_framework_moniker(reader)? {
        Some(moniker) if !moniker.is_empty() => {
            let framework = TargetFramework::parse(&moniker);
            if framework.is_none() {
                debug!("unrecognized target framework moniker '{moniker}'");
            }
            Ok(framework)
        }
        _ => infer_from_references(reader),
    }
}

fn infer_from_references(reader: &ModuleReader) -> Result<Option<TargetFramework>> {
    for reference in reader.assembly_refs().iter() {
        let reference = reference?;
        if let Some(short_name) = framework_of_reference(reader, &reference)? {
            return Ok(TargetFramework::parse(&short_name));
        }
    }

    Ok(None)
}

/// The short framework name implied by referencing one version of a core library.
fn framework_of_reference(reader: &ModuleReader, reference: &AssemblyRefRaw) -> Result<Option<String>> {
    let name = reader.string(reference.name)?;
    let version = reference.version;
    let (major, minor, build) = (version.major, version.minor, version.build);

    if name.eq_ignore_ascii_case("System.Runtime") {
        if major >= 5 {
            return Ok(Some(format!("netcoreapp{major}.{minor}")));
        }

        let short_name = match (major, minor, build) {
            (4, 1, _) => Some("netcoreapp1.0"),
            (4, 2, 1) => Some("netcoreapp2.1"),
            (4, 2, 2) => Some("netcoreapp3.1"),
            (4, 2, _) => Some("netcoreapp2.0"),
            (4, 0, 10) => Some("netstandard1.2"),
            (4, 0, 20) => Some("netstandard1.3"),
            (4, 0, _) => Some("netstandard1.0"),
            _ => None,
        };
        if let Some(short_name) = short_name {
            return Ok(Some(short_name.to_string()));
        }
    }

    if name.eq_ignore_ascii_case("netstandard") {
        return Ok(Some(format!("netstandard{major}.{minor}")));
    }

    if !reference.has_full_public_key() && name.eq_ignore_ascii_case("mscorlib") {
        if reader.blob(reference.public_key_or_token)? != ECMA_TOKEN {
            return Ok(None);
        }

        let short_name = match (major, minor, build) {
            (1, 0, 3300) => Some("net1.0"),
            (1, 0, 5000) | (2, _, _) => Some("net2.0"),
            (4, _, _) => Some("net4.0"),
            _ => None,
        };
        return Ok(short_name.map(str::to_string));
    }

    Ok(None)
}
