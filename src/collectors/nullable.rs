use crate::{
    collectors::{Context, FeatureUsage, IncrementalUsageCollector},
    crawler::AssemblyContext,
    metadata::{naming::is_named_any, reader::ModuleReader},
    Result,
};

const COMPILER_SERVICES: &str = "System.Runtime.CompilerServices";

const NULLABLE_ATTRIBUTES: &[&str] = &[
    "NullableAttribute",
    "NullableContextAttribute",
    "NullablePublicOnlyAttribute",
];

/// Reports whether the module was compiled with nullable reference types enabled.
///
/// The compiler records nullability through a small set of attributes. Frameworks before
/// .NET 8 don't ship them, so the compiler embeds private copies as type definitions; from
/// .NET 8 on only references to the framework's types are looked at.
#[derive(Debug, Default)]
pub struct UsesNullableReferenceTypesCollector;

impl IncrementalUsageCollector for UsesNullableReferenceTypesCollector {
    const VERSION_REQUIRED: u32 = 3;
    const NAME: &'static str = "UsesNullableReferenceTypes";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        for typeref in reader.type_refs().iter() {
            let typeref = typeref?;
            if is_named_any(reader, typeref.token, COMPILER_SERVICES, NULLABLE_ATTRIBUTES)? {
                report_once!(context, FeatureUsage::UsesNullableReferenceTypes);
            }
        }

        if assembly
            .framework
            .as_ref()
            .is_some_and(|framework| framework.is_net_core_at_least(8, 0))
        {
            return Ok(());
        }

        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;
            if is_named_any(reader, typedef.token, COMPILER_SERVICES, NULLABLE_ATTRIBUTES)? {
                report_once!(context, FeatureUsage::UsesNullableReferenceTypes);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collectors::tests::{collect, collect_with},
        crawler::TargetFramework,
        test::ModuleBuilder,
    };

    fn with_local_attribute() -> Vec<u8> {
        let mut builder = ModuleBuilder::new("Nullable");
        let attribute = builder.type_ref("System", "Attribute");
        builder.type_def(COMPILER_SERVICES, "NullableContextAttribute", attribute);
        builder.build()
    }

    #[test]
    fn no_nullable_metadata() {
        let mut builder = ModuleBuilder::new("Plain");
        let object = builder.type_ref("System", "Object");
        builder.type_ref(COMPILER_SERVICES, "CompilerGeneratedAttribute");
        builder.type_def("Sample", "NullableAttribute", object);

        assert!(collect::<UsesNullableReferenceTypesCollector>(builder.build()).is_empty());
    }

    #[test]
    fn referenced_attribute() {
        let mut builder = ModuleBuilder::new("Nullable");
        builder.type_ref(COMPILER_SERVICES, "NullablePublicOnlyAttribute");

        assert_eq!(
            collect::<UsesNullableReferenceTypesCollector>(builder.build()),
            ["UsesNullableReferenceTypes"]
        );
    }

    #[test]
    fn local_attribute() {
        assert_eq!(
            collect::<UsesNullableReferenceTypesCollector>(with_local_attribute()),
            ["UsesNullableReferenceTypes"]
        );

        let net6 = AssemblyContext::for_framework(TargetFramework::parse("net6.0").unwrap());
        assert_eq!(
            collect_with::<UsesNullableReferenceTypesCollector>(with_local_attribute(), &net6)
                .len(),
            1
        );
    }

    #[test]
    fn net8_ignores_local_definitions() {
        let net8 = AssemblyContext::for_framework(TargetFramework::parse("net8.0").unwrap());
        assert!(
            collect_with::<UsesNullableReferenceTypesCollector>(with_local_attribute(), &net8)
                .is_empty()
        );

        let mut builder = ModuleBuilder::new("Nullable");
        builder.type_ref(COMPILER_SERVICES, "NullableAttribute");
        assert_eq!(
            collect_with::<UsesNullableReferenceTypesCollector>(builder.build(), &net8),
            ["UsesNullableReferenceTypes"]
        );
    }
}
