use crate::{
    collectors::{is_field_reference, Context, FeatureUsage, IncrementalUsageCollector},
    crawler::{ApiKey, AssemblyContext},
    disassembler::OpCode,
    metadata::{
        naming::{documentation_parent, member_ref_doc_id},
        reader::ModuleReader,
        tables::{MemberRefRaw, TableId},
    },
    Result,
};

/// Reports reads and writes of external fields by the module's method bodies.
///
/// `ldfld`/`ldsfld` are reads and `stfld`/`stsfld` are writes. Taking a field's address is
/// neither.
#[derive(Debug, Default)]
pub struct FieldAccessCollector;

impl IncrementalUsageCollector for FieldAccessCollector {
    const VERSION_REQUIRED: u32 = 4;
    const NAME: &'static str = "FieldAccess";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        _assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;

            for method in reader.methods(&typedef)? {
                for (opcode, operand) in reader.instructions(&method) {
                    let Some(token) = operand.filter(|token| !token.is_nil()) else {
                        continue;
                    };
                    if !token.is(TableId::MemberRef) {
                        continue;
                    }

                    let memberref = reader.row::<MemberRefRaw>(token.row())?;
                    let parent = documentation_parent(reader, &memberref)?;
                    if !parent.is_some_and(|parent| parent.is(TableId::TypeRef)) {
                        continue;
                    }

                    if !is_field_reference(reader, &memberref)? {
                        continue;
                    }

                    let feature: fn(ApiKey) -> FeatureUsage = match opcode {
                        OpCode::LDSFLD | OpCode::LDFLD => FeatureUsage::FieldRead,
                        OpCode::STSFLD | OpCode::STFLD => FeatureUsage::FieldWrite,
                        _ => continue,
                    };

                    if let Some(doc_id) = member_ref_doc_id(reader, &memberref)? {
                        context.report(feature(ApiKey::new(doc_id)));
                    }
                }
            }
        }

        Ok(())
    }
}
