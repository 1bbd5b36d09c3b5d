use crate::{
    collectors::{Context, FeatureUsage, IncrementalUsageCollector},
    crawler::{ApiKey, AssemblyContext},
    metadata::{
        naming::{type_ref_doc_id, type_spec_target},
        reader::ModuleReader,
        tables::{CodedIndex, TableId, TypeRefRaw, TypeSpecRaw},
    },
    Result,
};

/// Reports every external type that a type of the module derives from or implements.
///
/// Generic bases count through their generic type: `class C : List<int>` reports
/// ``T:System.Collections.Generic.List`1``.
#[derive(Debug, Default)]
pub struct DerivesFromCollector;

impl IncrementalUsageCollector for DerivesFromCollector {
    const VERSION_REQUIRED: u32 = 4;
    const NAME: &'static str = "DerivesFrom";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        _assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;
            report_base(reader, typedef.extends, context)?;

            for implementation in reader.interfaces_of(typedef.rid)? {
                report_base(reader, implementation.interface, context)?;
            }
        }

        Ok(())
    }
}

fn report_base(reader: &ModuleReader, base: CodedIndex, context: &mut Context<'_>) -> Result<()> {
    if base.is_nil() {
        return Ok(());
    }

    let target = match base.tag {
        TableId::TypeSpec => {
            let typespec = reader.row::<TypeSpecRaw>(base.row)?;
            type_spec_target(reader, &typespec)?
        }
        _ => Some(base.token),
    };

    let Some(target) = target.filter(|token| token.is(TableId::TypeRef)) else {
        return Ok(());
    };

    let typeref = reader.row::<TypeRefRaw>(target.row())?;
    if let Some(doc_id) = type_ref_doc_id(reader, &typeref)? {
        context.report(FeatureUsage::DerivesFrom(ApiKey::new(doc_id)));
    }

    Ok(())
}
