//! Walks a custom attribute value blob (ECMA-335 II.23.3) up to its named arguments.
//!
//! Fixed arguments are stored back to back with no type information, so their width has to be
//! derived from the constructor signature. That signature may name a generic parameter of the
//! attribute type (`!0`), which is resolved against the instantiation the constructor reference
//! hangs off, and it may name an enum, whose width comes from an [`EnumResolver`].
//!
//! When a width cannot be determined the walk stops quietly: the iterator ends without an
//! error, and whatever was already reported stays valid.

use crate::{
    file::parser::Parser,
    metadata::{
        customattributes::{
            enums::{local_enum_underlying_type, EnumResolver, EnumTypeName},
            ArgumentType, ElementKind, NamedArgument, NamedArgumentKind, SERIALIZATION_TYPE,
        },
        diagnostics::DiagnosticCategory,
        reader::ModuleReader,
        signatures::{PrimitiveTypeCode, SignatureHeader, SignatureKind, ELEMENT_TYPE, MAX_RECURSION_DEPTH},
        tables::{CustomAttributeRaw, MemberRefRaw, TableId, TypeDefRaw, TypeRefRaw, TypeSpecRaw},
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

/// Largest parameter count a constructor signature may declare.
const MAX_PARAMETER_COUNT: u32 = 0x1FFF_FFFF;

enum State {
    Ready { remaining: u16 },
    Failed(crate::Error),
    Done,
}

/// Iterator over the named arguments of one custom attribute.
///
/// Only attributes constructed through a member reference can be walked; for any other
/// constructor the iterator is empty. Malformed input yields one `Err`, after which the
/// iterator ends.
///
/// ```rust,no_run
/// use usagescope::metadata::{customattributes::NamedArguments, reader::ModuleReader};
/// use usagescope::metadata::token::Token;
///
/// # fn example(reader: &ModuleReader) -> usagescope::Result<()> {
/// let assembly = Token::new(0x2000_0001);
/// for attribute in reader.custom_attributes(assembly)? {
///     for argument in NamedArguments::new(reader, &attribute, None) {
///         println!("{:?}", argument?);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct NamedArguments<'r> {
    reader: &'r ModuleReader,
    resolver: Option<&'r dyn EnumResolver>,
    value: Parser<'r>,
    state: State,
}

impl<'r> NamedArguments<'r> {
    /// Reads the prolog and skips all fixed arguments of `attribute`.
    #[must_use]
    pub fn new(
        reader: &'r ModuleReader,
        attribute: &CustomAttributeRaw,
        resolver: Option<&'r dyn EnumResolver>,
    ) -> Self {
        let mut arguments = NamedArguments {
            reader,
            resolver,
            value: Parser::new(&[]),
            state: State::Done,
        };

        if attribute.constructor.tag != TableId::MemberRef {
            return arguments;
        }

        arguments.state = match arguments.read_header(attribute) {
            Ok(Some(remaining)) => State::Ready { remaining },
            Ok(None) => State::Done,
            Err(error) => State::Failed(error),
        };
        arguments
    }

    /// Validates the blob and the constructor, then consumes the fixed arguments. Returns the
    /// named argument count, or `None` if a fixed argument could not be sized.
    fn read_header(&mut self, attribute: &CustomAttributeRaw) -> Result<Option<u16>> {
        let constructor = self.reader.row::<MemberRefRaw>(attribute.constructor.row)?;

        let context = if constructor.class.tag == TableId::TypeSpec {
            self.generic_context(&constructor)?
        } else {
            None
        };

        self.value = Parser::new(self.reader.blob(attribute.value)?);
        if self.value.read_le::<u16>()? != 0x0001 {
            return Err(malformed_error!(
                "Custom attribute {} has an invalid prolog",
                attribute.token
            ));
        }

        let mut signature = Parser::new(self.reader.blob(constructor.signature)?);
        let header = SignatureHeader(signature.read_le::<u8>()?);
        if header.kind() != SignatureKind::Method || header.is_generic() {
            return Err(malformed_error!(
                "Attribute constructor {} has signature header {}",
                constructor.token,
                header.0
            ));
        }

        let parameter_count = signature.read_compressed_uint()?;
        if parameter_count > MAX_PARAMETER_COUNT {
            return Err(malformed_error!(
                "Attribute constructor {} declares {} parameters",
                constructor.token,
                parameter_count
            ));
        }

        if signature.read_le::<u8>()? != ELEMENT_TYPE::VOID {
            return Err(malformed_error!(
                "Attribute constructor {} does not return void",
                constructor.token
            ));
        }

        for _ in 0..parameter_count {
            let Some(argument_type) = self.signature_type(&mut signature, context.as_ref(), false)? else {
                return Ok(None);
            };

            if !self.skip_value(argument_type)? {
                return Ok(None);
            }
        }

        Ok(Some(self.value.read_le::<u16>()?))
    }

    /// Positions a parser at the argument count of the generic instantiation the constructor
    /// belongs to.
    fn generic_context(&self, constructor: &MemberRefRaw) -> Result<Option<Parser<'r>>> {
        let typespec = self.reader.row::<TypeSpecRaw>(constructor.class.row)?;
        if typespec.signature == 0 {
            return Ok(None);
        }

        let mut context = Parser::new(self.reader.blob(typespec.signature)?);
        if context.read_compressed_uint()? != u32::from(ELEMENT_TYPE::GENERICINST) {
            return Ok(None);
        }

        let kind = context.read_compressed_uint()?;
        if kind != u32::from(ELEMENT_TYPE::CLASS) && kind != u32::from(ELEMENT_TYPE::VALUETYPE) {
            return Err(malformed_error!(
                "Generic instantiation over element type {}",
                kind
            ));
        }

        context.read_compressed_token()?;
        Ok(Some(context))
    }

    /// The serialized type of the next parameter in a constructor signature, or `None` if the
    /// parameter cannot be serialized or sized.
    fn signature_type(
        &self,
        signature: &mut Parser<'r>,
        context: Option<&Parser<'r>>,
        is_element: bool,
    ) -> Result<Option<ArgumentType>> {
        let code = signature.read_le::<u8>()?;

        if let Some(kind) = ElementKind::from_primitive_byte(code) {
            return Ok(Some(ArgumentType::Element(kind)));
        }

        match code {
            ELEMENT_TYPE::OBJECT => Ok(Some(ArgumentType::Element(ElementKind::TaggedObject))),
            ELEMENT_TYPE::CLASS | ELEMENT_TYPE::VALUETYPE => {
                let token = signature.read_compressed_token()?;
                Ok(self.handle_kind(token)?.map(ArgumentType::Element))
            }
            ELEMENT_TYPE::SZARRAY => {
                if is_element {
                    return Err(malformed_error!("Nested arrays in attribute signature"));
                }

                // A null or empty array never reads its elements, so an unknown element type
                // only aborts once a value has to be skipped.
                match self.signature_type(signature, context, true)? {
                    Some(ArgumentType::Element(kind)) => Ok(Some(ArgumentType::SzArray(kind))),
                    Some(ArgumentType::SzArray(_)) => Ok(None),
                    None => Ok(Some(ArgumentType::SzArray(ElementKind::Unknown))),
                }
            }
            ELEMENT_TYPE::VAR => {
                let Some(context) = context else {
                    return Err(malformed_error!(
                        "Generic parameter outside of a generic instantiation"
                    ));
                };

                let mut context = context.clone();
                let argument_count = context.read_compressed_uint()?;
                let index = signature.read_compressed_uint()?;
                if index >= argument_count {
                    return Err(malformed_error!(
                        "Generic parameter {} of {} arguments",
                        index,
                        argument_count
                    ));
                }

                for _ in 0..index {
                    skip_type(&mut context)?;
                }

                self.signature_type(&mut context, None, is_element)
            }
            _ => Ok(None),
        }
    }

    /// `System.Type` or an enum; everything else cannot be serialized.
    fn handle_kind(&self, token: Token) -> Result<Option<ElementKind>> {
        match token.table_id() {
            Some(TableId::TypeRef) => {
                let typeref = self.reader.row::<TypeRefRaw>(token.row())?;
                if self.reader.string(typeref.type_namespace)? == "System"
                    && self.reader.string(typeref.type_name)? == "Type"
                {
                    return Ok(Some(ElementKind::Type));
                }

                let underlying = match EnumTypeName::from_type_ref(self.reader, &typeref)? {
                    Some(name) => self.resolve(&name),
                    None => None,
                };
                Ok(self.enum_kind(underlying))
            }
            Some(TableId::TypeDef) => {
                let typedef = self.reader.row::<TypeDefRaw>(token.row())?;
                let underlying = local_enum_underlying_type(self.reader, &typedef)?;
                Ok(self.enum_kind(underlying))
            }
            _ => Ok(None),
        }
    }

    fn enum_kind(&self, underlying: Option<PrimitiveTypeCode>) -> Option<ElementKind> {
        match ElementKind::from_enum_underlying(underlying) {
            ElementKind::Unknown => None,
            kind => Some(kind),
        }
    }

    fn resolve(&self, name: &EnumTypeName) -> Option<PrimitiveTypeCode> {
        let underlying = self.resolver.and_then(|resolver| resolver.underlying_type(name));
        if underlying.is_none() {
            self.reader.diagnostics().info(
                DiagnosticCategory::Enum,
                format!("Unresolved enum {name}"),
            );
        }
        underlying
    }

    /// Reads the type tag of a named argument or boxed value.
    fn tagged_type(&mut self, is_element: bool) -> Result<ArgumentType> {
        let code = self.value.read_le::<u8>()?;

        if let Some(kind) = ElementKind::from_primitive_byte(code) {
            return Ok(ArgumentType::Element(kind));
        }

        match code {
            SERIALIZATION_TYPE::TYPE => Ok(ArgumentType::Element(ElementKind::Type)),
            SERIALIZATION_TYPE::TAGGED_OBJECT => Ok(ArgumentType::Element(ElementKind::TaggedObject)),
            SERIALIZATION_TYPE::SZARRAY => {
                if is_element {
                    return Err(malformed_error!("Nested arrays in attribute value"));
                }

                match self.tagged_type(true)? {
                    ArgumentType::Element(kind) => Ok(ArgumentType::SzArray(kind)),
                    ArgumentType::SzArray(_) => Err(malformed_error!("Nested arrays in attribute value")),
                }
            }
            SERIALIZATION_TYPE::ENUM => {
                let underlying = match self.value.read_ser_string()?.and_then(EnumTypeName::parse) {
                    Some(name) => self.resolve(&name),
                    None => None,
                };
                Ok(ArgumentType::Element(ElementKind::from_enum_underlying(underlying)))
            }
            _ => Err(malformed_error!("Invalid serialization type - {}", code)),
        }
    }

    /// Consumes one value. Returns `false` if its width is unknown.
    fn skip_value(&mut self, argument_type: ArgumentType) -> Result<bool> {
        match argument_type {
            ArgumentType::Element(kind) => self.skip_element(kind),
            ArgumentType::SzArray(kind) => {
                let count = self.value.read_le::<i32>()?;
                if count < -1 {
                    return Err(malformed_error!("Invalid array length - {}", count));
                }

                for _ in 0..count.max(0) {
                    if !self.skip_element(kind)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn skip_element(&mut self, kind: ElementKind) -> Result<bool> {
        let kind = match kind {
            ElementKind::TaggedObject => match self.tagged_type(false)? {
                ArgumentType::Element(ElementKind::TaggedObject) => {
                    return Err(malformed_error!("Boxed value tagged as object"))
                }
                ArgumentType::Element(kind) => kind,
                array @ ArgumentType::SzArray(_) => return self.skip_value(array),
            },
            kind => kind,
        };

        let width = match kind {
            ElementKind::Unknown | ElementKind::TaggedObject => return Ok(false),
            ElementKind::Type | ElementKind::Primitive(PrimitiveTypeCode::String) => {
                self.value.skip_ser_string()?;
                return Ok(true);
            }
            ElementKind::Primitive(code) => match code {
                PrimitiveTypeCode::Boolean | PrimitiveTypeCode::SByte | PrimitiveTypeCode::Byte => 1,
                PrimitiveTypeCode::Char | PrimitiveTypeCode::Int16 | PrimitiveTypeCode::UInt16 => 2,
                PrimitiveTypeCode::Int32 | PrimitiveTypeCode::UInt32 | PrimitiveTypeCode::Single => 4,
                PrimitiveTypeCode::Int64 | PrimitiveTypeCode::UInt64 | PrimitiveTypeCode::Double => 8,
                _ => return Ok(false),
            },
        };

        self.value.advance_by(width)?;
        Ok(true)
    }

    fn next_argument(&mut self) -> Result<Option<NamedArgument>> {
        let kind = match self.value.read_le::<u8>()? {
            SERIALIZATION_TYPE::FIELD => NamedArgumentKind::Field,
            SERIALIZATION_TYPE::PROPERTY => NamedArgumentKind::Property,
            other => return Err(malformed_error!("Invalid named argument kind - {}", other)),
        };

        let argument_type = self.tagged_type(false)?;
        if argument_type == ArgumentType::Element(ElementKind::Unknown) {
            return Ok(None);
        }

        let name = self.value.read_ser_string()?.map(str::to_string);
        if !self.skip_value(argument_type)? {
            return Ok(None);
        }

        Ok(Some(NamedArgument { kind, name }))
    }
}

impl Iterator for NamedArguments<'_> {
    type Item = Result<NamedArgument>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Done => None,
            State::Failed(error) => Some(Err(error)),
            State::Ready { remaining: 0 } => None,
            State::Ready { remaining } => match self.next_argument() {
                Ok(Some(argument)) => {
                    self.state = State::Ready {
                        remaining: remaining - 1,
                    };
                    Some(Ok(argument))
                }
                Ok(None) => None,
                Err(error) => Some(Err(error)),
            },
        }
    }
}

/// Skips one type in a signature without decoding it.
///
/// # Errors
///
/// Returns an error for an unknown element type, truncated data or nesting deeper than
/// [`MAX_RECURSION_DEPTH`].
pub fn skip_type(parser: &mut Parser<'_>) -> Result<()> {
    skip_type_at(parser, 0)
}

fn skip_type_at(parser: &mut Parser<'_>, depth: usize) -> Result<()> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(RecursionLimit(MAX_RECURSION_DEPTH));
    }

    let code = parser.read_le::<u8>()?;
    if PrimitiveTypeCode::from_element_type(code).is_some() {
        return Ok(());
    }

    match code {
        ELEMENT_TYPE::PTR | ELEMENT_TYPE::BYREF | ELEMENT_TYPE::PINNED | ELEMENT_TYPE::SZARRAY => {
            skip_type_at(parser, depth + 1)
        }
        ELEMENT_TYPE::FNPTR => {
            let header = SignatureHeader(parser.read_le::<u8>()?);
            if header.is_generic() {
                parser.read_compressed_uint()?;
            }

            let parameter_count = parser.read_compressed_uint()?;
            skip_type_at(parser, depth + 1)?;
            for _ in 0..parameter_count {
                skip_type_at(parser, depth + 1)?;
            }
            Ok(())
        }
        ELEMENT_TYPE::ARRAY => {
            skip_type_at(parser, depth + 1)?;
            parser.read_compressed_uint()?;

            let sizes = parser.read_compressed_uint()?;
            for _ in 0..sizes {
                parser.read_compressed_uint()?;
            }

            let lower_bounds = parser.read_compressed_uint()?;
            for _ in 0..lower_bounds {
                parser.read_compressed_int()?;
            }
            Ok(())
        }
        ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
            parser.read_compressed_token()?;
            skip_type_at(parser, depth + 1)
        }
        ELEMENT_TYPE::GENERICINST => {
            skip_type_at(parser, depth + 1)?;
            let count = parser.read_compressed_uint()?;
            for _ in 0..count {
                skip_type_at(parser, depth + 1)?;
            }
            Ok(())
        }
        ELEMENT_TYPE::VAR | ELEMENT_TYPE::MVAR => {
            parser.read_compressed_uint()?;
            Ok(())
        }
        ELEMENT_TYPE::CLASS | ELEMENT_TYPE::VALUETYPE => {
            parser.read_compressed_token()?;
            Ok(())
        }
        _ => Err(malformed_error!("Cannot skip element type - {}", code)),
    }
}
