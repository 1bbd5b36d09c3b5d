//! Canonical names and documentation IDs of metadata entities.
//!
//! These helpers turn references into the strings used as API keys: `T:` for types, `M:` for
//! methods and `F:` for fields. Only entities that resolve outside of the module get a name;
//! anything scoped to the module itself, to a module reference, or nested more than one level
//! deep yields `None`.
//!
//! All functions are read-only over a [`ModuleReader`]. They return `Err` only for malformed
//! metadata (bad heap index, truncated signature, invalid row).

use crate::{
    file::parser::Parser,
    metadata::{
        reader::ModuleReader,
        signatures::{DocIdProvider, SignatureHeader, SignatureKind, ELEMENT_TYPE},
        tables::{CustomAttributeRaw, MemberRefRaw, TableId, TypeDefRaw, TypeRefRaw, TypeSpecRaw},
        token::Token,
    },
    Result,
};

/// The canonical name of a type reference, e.g. `System.Collections.Generic.List`1`.
///
/// A reference nested in another reference is named `Parent.Name` when the parent is scoped
/// to an assembly reference; deeper nesting and module-scoped references yield `None`.
///
/// # Errors
///
/// Returns an error if a name or a parent row cannot be read.
pub fn type_ref_name(reader: &ModuleReader, typeref: &TypeRefRaw) -> Result<Option<String>> {
    let scope = &typeref.resolution_scope;

    if scope.tag == TableId::TypeRef {
        let parent = reader.row::<TypeRefRaw>(scope.row)?;
        if parent.resolution_scope.tag != TableId::AssemblyRef {
            return Ok(None);
        }

        let Some(parent_name) = type_ref_name(reader, &parent)? else {
            return Ok(None);
        };

        let name = reader.string(typeref.type_name)?;
        return Ok(Some(format!("{parent_name}.{name}")));
    }

    if scope.tag != TableId::AssemblyRef {
        return Ok(None);
    }

    let name = reader.string(typeref.type_name)?.replace('+', ".");
    let namespace = reader.string(typeref.type_namespace)?;

    if namespace.is_empty() {
        Ok(Some(name))
    } else {
        Ok(Some(format!("{namespace}.{name}")))
    }
}

/// The canonical name of a `TypeRef` or of the generic type a `TypeSpec` instantiates.
///
/// Every other kind of token yields `None`, as does a specification whose target is not a type
/// reference.
///
/// # Errors
///
/// Returns an error if the row, its names or its signature are malformed.
pub fn entity_name(reader: &ModuleReader, token: Token) -> Result<Option<String>> {
    match token.table_id() {
        Some(TableId::TypeRef) => {
            let typeref = reader.row::<TypeRefRaw>(token.row())?;
            type_ref_name(reader, &typeref)
        }
        Some(TableId::TypeSpec) => {
            let typespec = reader.row::<TypeSpecRaw>(token.row())?;
            match type_spec_target(reader, &typespec)? {
                Some(target) if target.table_id() == Some(TableId::TypeRef) => {
                    let typeref = reader.row::<TypeRefRaw>(target.row())?;
                    type_ref_name(reader, &typeref)
                }
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

/// `T:` + [`type_ref_name`].
///
/// # Errors
///
/// Returns an error if a name or a parent row cannot be read.
pub fn type_ref_doc_id(reader: &ModuleReader, typeref: &TypeRefRaw) -> Result<Option<String>> {
    Ok(type_ref_name(reader, typeref)?.map(|name| format!("T:{name}")))
}

/// The documentation ID of a method or field reference.
///
/// ```text
/// M:System.Console.WriteLine(System.String)
/// M:System.Linq.Enumerable.Select``2(System.Collections.Generic.IEnumerable{``0},System.Func{``0,``1})
/// F:System.String.Empty
/// ```
///
/// Members of type definitions, method definitions and module references yield `None`.
///
/// # Errors
///
/// Returns an error if the signature is neither a method nor a field signature, or any part
/// of the reference is malformed.
pub fn member_ref_doc_id(reader: &ModuleReader, memberref: &MemberRefRaw) -> Result<Option<String>> {
    if !matches!(memberref.class.tag, TableId::TypeRef | TableId::TypeSpec) {
        return Ok(None);
    }

    let Some(parent_name) = entity_name(reader, memberref.class.token)? else {
        return Ok(None);
    };

    let blob = reader.blob(memberref.signature)?;
    let mut parser = Parser::new(blob);
    let header = SignatureHeader(parser.read_le::<u8>()?);

    let (prefix, parameters) = match header.kind() {
        SignatureKind::Method => {
            let signature = DocIdProvider::new(reader).decode_method_signature(blob)?;
            let parameters = if signature.parameter_types.is_empty() {
                String::new()
            } else {
                format!("({})", signature.parameter_types.join(","))
            };
            ('M', parameters)
        }
        SignatureKind::Field => ('F', String::new()),
        _ => {
            return Err(malformed_error!(
                "MemberRef {} has signature kind {:?}",
                memberref.token,
                header.kind()
            ))
        }
    };

    let arity = if header.is_generic() {
        format!("``{}", parser.read_compressed_uint()?)
    } else {
        String::new()
    };

    let name = reader.string(memberref.name)?.replace('.', "#");
    Ok(Some(format!("{prefix}:{parent_name}.{name}{arity}{parameters}")))
}

/// The type a member reference documents under: its parent, with a `TypeSpec` replaced by the
/// generic type it instantiates. `None` when that target cannot be determined.
///
/// # Errors
///
/// Returns an error if the specification's signature is malformed.
pub fn documentation_parent(reader: &ModuleReader, memberref: &MemberRefRaw) -> Result<Option<Token>> {
    if memberref.class.tag == TableId::TypeSpec {
        let typespec = reader.row::<TypeSpecRaw>(memberref.class.row)?;
        return type_spec_target(reader, &typespec);
    }

    Ok(Some(memberref.class.token))
}

/// The generic type a `GENERICINST` type specification instantiates.
///
/// Only `GENERICINST (CLASS|VALUETYPE) <TypeDefOrRef>` has a target; every other
/// specification (arrays, pointers, generic parameters) yields `None`, as does an
/// instantiation of another specification.
///
/// # Errors
///
/// Returns an error if the instantiated type is neither a class nor a value type, or the blob
/// is truncated.
pub fn type_spec_target(reader: &ModuleReader, typespec: &TypeSpecRaw) -> Result<Option<Token>> {
    let mut parser = Parser::new(reader.blob(typespec.signature)?);

    if parser.read_compressed_uint()? != u32::from(ELEMENT_TYPE::GENERICINST) {
        return Ok(None);
    }

    let kind = parser.read_compressed_uint()?;
    if kind != u32::from(ELEMENT_TYPE::CLASS) && kind != u32::from(ELEMENT_TYPE::VALUETYPE) {
        return Err(malformed_error!(
            "TypeSpec {} instantiates element type {}",
            typespec.token,
            kind
        ));
    }

    let target = parser.read_compressed_token()?;
    match target.table_id() {
        Some(TableId::TypeDef | TableId::TypeRef) => Ok(Some(target)),
        _ => Ok(None),
    }
}

/// Whether an attribute's type is `namespace.name`.
///
/// The constructor must be a member reference. Its parent matches when it is a type reference
/// scoped to an assembly reference, or, when `allow_typedef` is set, a non-nested type
/// definition of this module.
///
/// # Errors
///
/// Returns an error if the constructor or its parent cannot be read.
pub fn is_named(
    reader: &ModuleReader,
    attribute: &CustomAttributeRaw,
    namespace: &str,
    name: &str,
    allow_typedef: bool,
) -> Result<bool> {
    let Some(parent) = attribute_type(reader, attribute)? else {
        return Ok(false);
    };

    if parent.table_id() == Some(TableId::TypeDef) && !allow_typedef {
        return Ok(false);
    }

    is_named_any(reader, parent, namespace, &[name])
}

/// Whether a `TypeDef` or `TypeRef` token names one of `names` in `namespace`.
///
/// Nested definitions and references not scoped to an assembly reference never match. Any
/// other kind of token yields `false`.
///
/// # Errors
///
/// Returns an error if the row or its names cannot be read.
pub fn is_named_any(reader: &ModuleReader, token: Token, namespace: &str, names: &[&str]) -> Result<bool> {
    if names.is_empty() {
        return Ok(false);
    }

    let (type_namespace, type_name) = match token.table_id() {
        Some(TableId::TypeRef) => {
            let typeref = reader.row::<TypeRefRaw>(token.row())?;
            if typeref.resolution_scope.tag != TableId::AssemblyRef {
                return Ok(false);
            }
            (typeref.type_namespace, typeref.type_name)
        }
        Some(TableId::TypeDef) => {
            let typedef = reader.row::<TypeDefRaw>(token.row())?;
            if typedef.is_nested_visibility() {
                return Ok(false);
            }
            (typedef.type_namespace, typedef.type_name)
        }
        _ => return Ok(false),
    };

    if reader.string(type_namespace)? != namespace {
        return Ok(false);
    }

    let type_name = reader.string(type_name)?;
    Ok(names.iter().any(|name| *name == type_name))
}

/// The type that declares an attribute's constructor, if the constructor is a member
/// reference. Attributes constructed through a method definition yield `None`.
///
/// # Errors
///
/// Returns an error if the constructor row cannot be read.
pub fn attribute_type(reader: &ModuleReader, attribute: &CustomAttributeRaw) -> Result<Option<Token>> {
    if attribute.constructor.tag != TableId::MemberRef {
        return Ok(None);
    }

    let constructor = reader.row::<MemberRefRaw>(attribute.constructor.row)?;
    Ok(Some(constructor.class.token))
}

/// The framework the module declares through an assembly-level
/// `System.Runtime.Versioning.TargetFrameworkAttribute`, e.g. `.NETCoreApp,Version=v8.0`.
///
/// A value blob with a wrong prolog, a null string or malformed content yields `None`.
///
/// # Errors
///
/// Returns an error if the attribute rows cannot be read.
pub fn target_framework_moniker(reader: &ModuleReader) -> Result<Option<String>> {
    let assembly = Token::from_parts(TableId::Assembly, 1);

    for attribute in reader.custom_attributes(assembly)? {
        if !is_named(
            reader,
            &attribute,
            "System.Runtime.Versioning",
            "TargetFrameworkAttribute",
            true,
        )? {
            continue;
        }

        let mut parser = Parser::new(reader.blob(attribute.value)?);
        if !matches!(parser.read_le::<i16>(), Ok(1)) {
            return Ok(None);
        }

        return Ok(parser.read_ser_string().ok().flatten().map(str::to_string));
    }

    Ok(None)
}
