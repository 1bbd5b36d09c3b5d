use crate::{
    crawler::Crawl,
    metadata::{
        signatures::{ArrayShape, MethodSignature, PrimitiveTypeCode, SignatureTypeProvider},
        token::Token,
    },
    Result,
};

/// Records every entity a signature mentions.
///
/// The value of each shape is the handle underneath it (`List<int>[]` yields the `List`1`
/// reference), `None` for primitives, generic parameters and function pointers.
pub(super) struct SignatureWalker<'c, 'a> {
    crawl: &'c mut Crawl<'a>,
}

impl<'c, 'a> SignatureWalker<'c, 'a> {
    pub(super) fn new(crawl: &'c mut Crawl<'a>) -> Self {
        SignatureWalker { crawl }
    }

    fn element(&mut self, element: Option<Token>) -> Result<Option<Token>> {
        self.crawl.record_entity(element)?;
        Ok(element)
    }
}

impl SignatureTypeProvider for SignatureWalker<'_, '_> {
    type Type = Option<Token>;

    fn primitive(&mut self, code: PrimitiveTypeCode) -> Result<Self::Type> {
        self.crawl.record(format!("T:System.{}", code.name()));
        Ok(None)
    }

    fn type_definition(&mut self, token: Token, _raw_kind: u8) -> Result<Self::Type> {
        Ok(Some(token))
    }

    fn type_reference(&mut self, token: Token, _raw_kind: u8) -> Result<Self::Type> {
        self.crawl.record_type_ref(token.row())?;
        Ok(Some(token))
    }

    fn type_specification(&mut self, token: Token, _raw_kind: u8) -> Result<Self::Type> {
        Ok(Some(token))
    }

    fn sz_array(&mut self, element: Self::Type) -> Result<Self::Type> {
        self.element(element)
    }

    fn array(&mut self, element: Self::Type, _shape: &ArrayShape) -> Result<Self::Type> {
        self.element(element)
    }

    fn by_reference(&mut self, element: Self::Type) -> Result<Self::Type> {
        self.element(element)
    }

    fn pointer(&mut self, element: Self::Type) -> Result<Self::Type> {
        self.element(element)
    }

    fn pinned(&mut self, element: Self::Type) -> Result<Self::Type> {
        self.element(element)
    }

    fn generic_instantiation(
        &mut self,
        generic: Self::Type,
        arguments: Vec<Self::Type>,
    ) -> Result<Self::Type> {
        self.crawl.record_entity(generic)?;
        for argument in arguments {
            self.crawl.record_entity(argument)?;
        }
        Ok(generic)
    }

    fn generic_type_parameter(&mut self, _index: u32) -> Result<Self::Type> {
        Ok(None)
    }

    fn generic_method_parameter(&mut self, _index: u32) -> Result<Self::Type> {
        Ok(None)
    }

    fn modified(
        &mut self,
        _modifier: Self::Type,
        unmodified: Self::Type,
        _is_required: bool,
    ) -> Result<Self::Type> {
        self.element(unmodified)
    }

    fn function_pointer(&mut self, signature: MethodSignature<Self::Type>) -> Result<Self::Type> {
        for parameter in signature.parameter_types {
            self.crawl.record_entity(parameter)?;
        }
        Ok(None)
    }
}
