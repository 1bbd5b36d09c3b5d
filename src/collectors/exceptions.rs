use crate::{
    collectors::{is_field_reference, Context, FeatureUsage, IncrementalUsageCollector},
    crawler::{ApiKey, AssemblyContext},
    disassembler::{Instructions, OpCode},
    metadata::{
        naming::{documentation_parent, member_ref_doc_id, type_ref_doc_id, type_spec_target},
        reader::ModuleReader,
        tables::{MemberRefRaw, TableId, TypeRefRaw, TypeSpecRaw},
        token::Token,
    },
    Result,
};

/// Reports external exceptions that the module throws with `throw new` and external exception
/// types it catches.
///
/// A throw is `newobj <constructor>` directly followed by `throw`, with only `nop`s in
/// between. Catches come from the typed clauses of the method bodies.
#[derive(Debug, Default)]
pub struct ExceptionCollector;

impl IncrementalUsageCollector for ExceptionCollector {
    const VERSION_REQUIRED: u32 = 4;
    const NAME: &'static str = "Exception";

    fn collect_features(
        &self,
        reader: &ModuleReader,
        _assembly: &AssemblyContext,
        context: &mut Context<'_>,
    ) -> Result<()> {
        for typedef in reader.type_defs().iter() {
            let typedef = typedef?;

            for method in reader.methods(&typedef)? {
                let Some(body) = reader.method_body(&method) else {
                    continue;
                };

                let mut previous: Option<(OpCode, Option<Token>)> = None;
                for (opcode, operand) in Instructions::new(body.code) {
                    if opcode == OpCode::THROW {
                        if let Some((OpCode::NEWOBJ, Some(constructor))) = previous {
                            report_throw(reader, constructor, context)?;
                        }
                    }

                    if opcode != OpCode::NOP {
                        previous = Some((opcode, operand));
                    }
                }

                for handler in &body.exception_handlers {
                    if let Some(class) = handler.class_token() {
                        report_catch(reader, class, context)?;
                    }
                }
            }
        }

        Ok(())
    }
}

fn report_throw(reader: &ModuleReader, constructor: Token, context: &mut Context<'_>) -> Result<()> {
    if constructor.is_nil() || !constructor.is(TableId::MemberRef) {
        return Ok(());
    }

    let memberref = reader.row::<MemberRefRaw>(constructor.row())?;
    let parent = documentation_parent(reader, &memberref)?;
    if !parent.is_some_and(|parent| parent.is(TableId::TypeRef)) {
        return Ok(());
    }

    if is_field_reference(reader, &memberref)? {
        return Ok(());
    }

    if let Some(doc_id) = member_ref_doc_id(reader, &memberref)? {
        context.report(FeatureUsage::ExceptionThrow(ApiKey::new(doc_id)));
    }

    Ok(())
}

fn report_catch(reader: &ModuleReader, class: Token, context: &mut Context<'_>) -> Result<()> {
    if class.is_nil() {
        return Ok(());
    }

    let class = if class.is(TableId::TypeSpec) {
        let typespec = reader.row::<TypeSpecRaw>(class.row())?;
        type_spec_target(reader, &typespec)?
    } else {
        Some(class)
    };

    let Some(class) = class.filter(|class| class.is(TableId::TypeRef)) else {
        return Ok(());
    };

    let typeref = reader.row::<TypeRefRaw>(class.row())?;
    if let Some(doc_id) = type_ref_doc_id(reader, &typeref)? {
        context.report(FeatureUsage::ExceptionCatch(ApiKey::new(doc_id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{collectors::tests::collect, test::ModuleBuilder};

    const CTOR: &[u8] = &[0x20, 0x00, 0x01];
    const CTOR_STRING: &[u8] = &[0x20, 0x01, 0x01, 0x0E];

    fn newobj(token: Token) -> Vec<u8> {
        let mut code = vec![0x73];
        code.extend_from_slice(&token.value().to_le_bytes());
        code
    }

    fn thrower(code: &[u8]) -> Vec<String> {
        let mut builder = ModuleBuilder::new("Throws");
        let object = builder.type_ref("System", "Object");
        let exception = builder.type_ref("System", "InvalidOperationException");
        let constructor = builder.member_ref(exception, ".ctor", CTOR);
        assert_eq!(constructor, Token::new(0x0A00_0001));

        let owner = builder.type_def("Sample", "Thrower", object);
        builder.method(owner, "Fail", &[0x00, 0x00, 0x01], Some(code));
        collect::<ExceptionCollector>(builder.build())
    }

    #[test]
    fn throw_new() {
        let mut code = newobj(Token::new(0x0A00_0001));
        code.push(0x7A);
        assert_eq!(
            thrower(&code),
            ["ExceptionThrow(M:System.InvalidOperationException.#ctor)"]
        );
    }

    #[test]
    fn nops_between_newobj_and_throw() {
        let mut code = newobj(Token::new(0x0A00_0001));
        code.extend_from_slice(&[0x00, 0x00, 0x7A]);
        assert_eq!(thrower(&code).len(), 1);
    }

    #[test]
    fn throw_without_newobj() {
        // ldnull; throw
        assert!(thrower(&[0x14, 0x7A]).is_empty());

        // newobj; pop; ldnull; throw
        let mut code = newobj(Token::new(0x0A00_0001));
        code.extend_from_slice(&[0x26, 0x14, 0x7A]);
        assert!(thrower(&code).is_empty());
    }

    #[test]
    fn local_exceptions_are_ignored() {
        let mut builder = ModuleBuilder::new("Throws");
        let exception_base = builder.type_ref("System", "Exception");
        let local = builder.type_def("Sample", "MyException", exception_base);
        let constructor = builder.member_ref(
            Token::from_parts(TableId::TypeDef, local),
            ".ctor",
            CTOR_STRING,
        );

        let mut code = vec![0x72, 0x01, 0x00, 0x00, 0x70];
        code.extend(newobj(constructor));
        code.push(0x7A);
        builder.method(local, "Fail", &[0x00, 0x00, 0x01], Some(&code));

        assert!(collect::<ExceptionCollector>(builder.build()).is_empty());
    }

    #[test]
    fn typed_catch_clauses() {
        let mut builder = ModuleBuilder::new("Catches");
        let object = builder.type_ref("System", "Object");
        let io = builder.type_ref("System.IO", "IOException");
        let owner = builder.type_def("Sample", "Catcher", object);
        let local = builder.type_def("Sample", "LocalException", object);
        let method = builder.method(
            owner,
            "Run",
            &[0x00, 0x00, 0x01],
            Some(&[0x00, 0xDE, 0x02, 0x26, 0xDE, 0x00, 0x2A]),
        );
        builder.catch_clause(method, io);
        builder.catch_clause(method, Token::from_parts(TableId::TypeDef, local));

        assert_eq!(
            collect::<ExceptionCollector>(builder.build()),
            ["ExceptionCatch(T:System.IO.IOException)"]
        );
    }
}
