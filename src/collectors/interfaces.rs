//! Detectors for interface members with implementations.

use crate::{
    collectors::{Context, FeatureUsage, IncrementalUsageCollector},
    crawler::{ApiKey, AssemblyContext},
    metadata::{
        method::MethodAttributes,
        naming::member_ref_doc_id,
        reader::ModuleReader,
        tables::{MemberRefRaw, TableId},
    },
    Result,
};

/// Reports every external interface method that an interface of the module overrides
/// explicitly, i.e. provides a default implementation for.
#[derive(Debug, Default)]
pub struct DefaultInterfaceImplementationCollector;

impl IncrementalUsageCollector for DefaultInterfaceImplementationCollector {
    const VERSION_REQUIRED: u32 = 4;
    const NAME: &'static str = "DefaultInterfaceImplementation";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        _assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;
            if !typedef.is_interface() {
                continue;
            }

            for implementation in reader.method_impls_of(typedef.rid)? {
                let declaration = implementation.method_declaration;
                if declaration.tag != TableId::MemberRef {
                    continue;
                }

                let memberref = reader.row::<MemberRefRaw>(declaration.row)?;
                if let Some(doc_id) = member_ref_doc_id(reader, &memberref)? {
                    context.report(FeatureUsage::Dim(ApiKey::new(doc_id)));
                }
            }
        }

        Ok(())
    }
}

/// Reports whether any interface of the module has a method with a body.
#[derive(Debug, Default)]
pub struct DefinesAnyDefaultInterfaceMembersCollector;

impl IncrementalUsageCollector for DefinesAnyDefaultInterfaceMembersCollector {
    const VERSION_REQUIRED: u32 = 2;
    const NAME: &'static str = "DefinesAnyDefaultInterfaceMembers";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        _assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;
            if !typedef.is_interface() {
                continue;
            }

            if reader.methods(&typedef)?.iter().any(|method| method.rva != 0) {
                report_once!(context, FeatureUsage::DefinesAnyDefaultInterfaceMembers);
            }
        }

        Ok(())
    }
}

/// Reports whether any interface of the module declares a `static virtual` or
/// `static abstract` method.
#[derive(Debug, Default)]
pub struct DefinesAnyVirtualStaticInterfaceMembersCollector;

impl IncrementalUsageCollector for DefinesAnyVirtualStaticInterfaceMembersCollector {
    const VERSION_REQUIRED: u32 = 2;
    const NAME: &'static str = "DefinesAnyVirtualStaticInterfaceMembers";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        _assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        let mask = MethodAttributes::STATIC | MethodAttributes::VIRTUAL;

        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;
            if !typedef.is_interface() {
                continue;
            }

            for method in reader.methods(&typedef)? {
                if method.attributes().contains(mask) {
                    report_once!(context, FeatureUsage::DefinesAnyVirtualStaticInterfaceMembers);
                }
            }
        }

        Ok(())
    }
}
