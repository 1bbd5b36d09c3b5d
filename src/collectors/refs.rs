//! Detectors for `ref struct` and `ref` field definitions.

use crate::{
    collectors::{Context, FeatureUsage, IncrementalUsageCollector},
    crawler::AssemblyContext,
    file::parser::Parser,
    metadata::{
        reader::ModuleReader,
        signatures::{SignatureHeader, SignatureKind, ELEMENT_TYPE},
        tables::{MemberRefRaw, TableId, TypeDefRaw, TypeRefRaw},
        token::Token,
    },
    Result,
};

/// Reports whether any field of the module is a `ref` field.
#[derive(Debug, Default)]
pub struct DefinesAnyRefFieldsCollector;

impl IncrementalUsageCollector for DefinesAnyRefFieldsCollector {
    const VERSION_REQUIRED: u32 = 3;
    const NAME: &'static str = "DefinesAnyRefFields";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        _assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;

            for field in reader.fields(&typedef)? {
                if is_by_reference(reader.blob(field.signature)?)? {
                    report_once!(context, FeatureUsage::DefinesAnyRefFields);
                }
            }
        }

        Ok(())
    }
}

/// Whether a field signature's type, past its custom modifiers, is `BYREF`.
fn is_by_reference(signature: &[u8]) -> Result<bool> {
    let mut parser = Parser::new(signature);
    if SignatureHeader(parser.read_le::<u8>()?).kind() != SignatureKind::Field {
        return Ok(false);
    }

    let mut element = parser.read_le::<u8>()?;
    while element == ELEMENT_TYPE::CMOD_OPT || element == ELEMENT_TYPE::CMOD_REQD {
        parser.read_compressed_uint()?;
        element = parser.read_le::<u8>()?;
    }

    Ok(element == ELEMENT_TYPE::BYREF)
}

/// Reports whether any type of the module is marked with `IsByRefLikeAttribute`, which the
/// compiler emits for every `ref struct`.
#[derive(Debug, Default)]
pub struct DefinesAnyRefStructsCollector;

impl IncrementalUsageCollector for DefinesAnyRefStructsCollector {
    const VERSION_REQUIRED: u32 = 2;
    const NAME: &'static str = "DefinesAnyRefStructs";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        _assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;

            for attribute in reader.custom_attributes(typedef.token)? {
                if attribute.constructor.tag != TableId::MemberRef {
                    continue;
                }

                let constructor = reader.row::<MemberRefRaw>(attribute.constructor.row)?;
                if is_by_ref_like_attribute(reader, constructor.class.token)? {
                    report_once!(context, FeatureUsage::DefinesAnyRefStructs);
                }
            }
        }

        Ok(())
    }
}

/// Compares namespace and name only: a local definition of the attribute (emitted by
/// compilers targeting frameworks that lack it) counts, whatever its nesting.
fn is_by_ref_like_attribute(reader: &ModuleReader, parent: Token) -> Result<bool> {
    let (namespace, name) = match parent.table_id() {
        Some(TableId::TypeRef) => {
            let typeref = reader.row::<TypeRefRaw>(parent.row())?;
            (typeref.type_namespace, typeref.type_name)
        }
        Some(TableId::TypeDef) => {
            let typedef = reader.row::<TypeDefRaw>(parent.row())?;
            (typedef.type_namespace, typedef.type_name)
        }
        _ => return Ok(false),
    };

    Ok(reader.string(namespace)? == "System.Runtime.CompilerServices"
        && reader.string(name)? == "IsByRefLikeAttribute")
}
