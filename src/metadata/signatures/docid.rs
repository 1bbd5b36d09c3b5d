//! Renders signature types in documentation-ID form.
//!
//! The same notation the C# compiler writes into XML documentation files: `System.Int32`,
//! `System.Collections.Generic.List{System.String}`, `` `0 `` and ``` ``0 ``` for generic
//! parameters, `@` for by-ref and `[,]` for multi-dimensional arrays. Generic type definitions
//! reached through a `TypeRef` lose their arity suffix (`List`1` becomes `List`), custom
//! modifiers are dropped and nested types are joined with `.`.

use crate::{
    metadata::{
        reader::ModuleReader,
        signatures::{
            decoder::MAX_RECURSION_DEPTH, ArrayShape, MethodSignature, PrimitiveTypeCode,
            SignatureDecoder, SignatureTypeProvider,
        },
        tables::{TableId, TypeDefRaw, TypeRefRaw, TypeSpecRaw},
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

/// A [`SignatureTypeProvider`] that produces documentation-ID strings.
///
/// Handles are resolved against the module being read, including `TypeSpec` blobs, which are
/// decoded recursively.
pub struct DocIdProvider<'r> {
    reader: &'r ModuleReader,
    depth: usize,
}

impl<'r> DocIdProvider<'r> {
    /// Creates a provider that resolves handles against `reader`.
    #[must_use]
    pub fn new(reader: &'r ModuleReader) -> Self {
        DocIdProvider { reader, depth: 0 }
    }

    /// Decodes a type signature blob into its documentation-ID form.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob or any handle it refers to is malformed.
    pub fn decode_type(&mut self, blob: &[u8]) -> Result<String> {
        self.nested(|provider| SignatureDecoder::new(blob, provider).decode_type())
    }

    /// Decodes a method or property signature blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob or any handle it refers to is malformed.
    pub fn decode_method_signature(&mut self, blob: &[u8]) -> Result<MethodSignature<String>> {
        self.nested(|provider| SignatureDecoder::new(blob, provider).decode_method_signature())
    }

    /// Decodes a field signature blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob or any handle it refers to is malformed.
    pub fn decode_field_signature(&mut self, blob: &[u8]) -> Result<String> {
        self.nested(|provider| SignatureDecoder::new(blob, provider).decode_field_signature())
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            self.depth -= 1;
            return Err(RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let result = f(self);
        self.depth -= 1;
        result
    }

    fn type_def_name(&mut self, typedef: &TypeDefRaw) -> Result<String> {
        let name = self.reader.string(typedef.type_name)?;

        if let Some(enclosing) = self.reader.declaring_type(typedef.rid) {
            let enclosing = self.reader.row::<TypeDefRaw>(enclosing)?;
            let declaring = self.nested(|provider| provider.type_def_name(&enclosing))?;
            return Ok(format!("{declaring}.{name}"));
        }

        Ok(qualify(self.reader.string(typedef.type_namespace)?, name))
    }

    fn type_ref_name(&mut self, typeref: &TypeRefRaw) -> Result<String> {
        let name = self.reader.string(typeref.type_name)?;

        if typeref.resolution_scope.tag == TableId::TypeRef && !typeref.resolution_scope.is_nil() {
            let scope = self.reader.row::<TypeRefRaw>(typeref.resolution_scope.row)?;
            let declaring = self.nested(|provider| provider.type_ref_name(&scope))?;
            return Ok(format!("{declaring}.{name}"));
        }

        let name = match name.find('`') {
            Some(backtick) if backtick > 0 => &name[..backtick],
            _ => name,
        };

        Ok(qualify(
            self.reader.string(typeref.type_namespace)?,
            &name.replace('+', "."),
        ))
    }
}

/// Prefixes `name` with `namespace` unless the namespace is empty.
fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

impl SignatureTypeProvider for DocIdProvider<'_> {
    type Type = String;

    fn primitive(&mut self, code: PrimitiveTypeCode) -> Result<String> {
        Ok(format!("System.{code}"))
    }

    fn type_definition(&mut self, token: Token, _raw_kind: u8) -> Result<String> {
        let typedef = self.reader.row::<TypeDefRaw>(token.row())?;
        self.type_def_name(&typedef)
    }

    fn type_reference(&mut self, token: Token, _raw_kind: u8) -> Result<String> {
        let typeref = self.reader.row::<TypeRefRaw>(token.row())?;
        self.type_ref_name(&typeref)
    }

    fn type_specification(&mut self, token: Token, _raw_kind: u8) -> Result<String> {
        let typespec = self.reader.row::<TypeSpecRaw>(token.row())?;
        let blob = self.reader.blob(typespec.signature)?;
        self.decode_type(blob)
    }

    fn sz_array(&mut self, element: String) -> Result<String> {
        Ok(element + "[]")
    }

    fn array(&mut self, element: String, shape: &ArrayShape) -> Result<String> {
        let commas = ",".repeat(shape.rank.saturating_sub(1) as usize);
        Ok(format!("{element}[{commas}]"))
    }

    fn by_reference(&mut self, element: String) -> Result<String> {
        Ok(element + "@")
    }

    fn pointer(&mut self, element: String) -> Result<String> {
        Ok(element + "*")
    }

    fn pinned(&mut self, element: String) -> Result<String> {
        Ok(element + "&")
    }

    fn generic_instantiation(&mut self, generic: String, arguments: Vec<String>) -> Result<String> {
        Ok(format!("{generic}{{{}}}", arguments.join(",")))
    }

    fn generic_type_parameter(&mut self, index: u32) -> Result<String> {
        Ok(format!("`{index}"))
    }

    fn generic_method_parameter(&mut self, index: u32) -> Result<String> {
        Ok(format!("``{index}"))
    }

    fn modified(&mut self, _modifier: String, unmodified: String, _is_required: bool) -> Result<String> {
        Ok(unmodified)
    }

    fn function_pointer(&mut self, signature: MethodSignature<String>) -> Result<String> {
        Ok(format!(
            "function {} ({})",
            signature.return_type,
            signature.parameter_types.join(",")
        ))
    }
}
