use crate::{
    file::parser::Parser,
    metadata::{
        signatures::{
            ArrayShape, MethodSignature, PrimitiveTypeCode, SignatureHeader, SignatureKind,
            ELEMENT_TYPE,
        },
        tables::TableId,
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

/// Maximum nesting of type shapes inside one signature blob
pub const MAX_RECURSION_DEPTH: usize = 50;

/// Receives the shapes of a signature as [`SignatureDecoder`] walks it, and builds a value of
/// its own choosing for each.
///
/// The decoder calls the element methods bottom-up: for `List<int>[]` it calls
/// `type_reference`, `primitive`, `generic_instantiation` and finally `sz_array`.
pub trait SignatureTypeProvider {
    /// The value built for one type.
    type Type;

    /// A built-in type.
    fn primitive(&mut self, code: PrimitiveTypeCode) -> Result<Self::Type>;

    /// A type defined in this module. `raw_kind` is `CLASS` or `VALUETYPE` (0 if unknown).
    fn type_definition(&mut self, token: Token, raw_kind: u8) -> Result<Self::Type>;

    /// A type defined elsewhere.
    fn type_reference(&mut self, token: Token, raw_kind: u8) -> Result<Self::Type>;

    /// A type described by another signature.
    fn type_specification(&mut self, token: Token, raw_kind: u8) -> Result<Self::Type>;

    /// `T[]`
    fn sz_array(&mut self, element: Self::Type) -> Result<Self::Type>;

    /// `T[,]` and friends.
    fn array(&mut self, element: Self::Type, shape: &ArrayShape) -> Result<Self::Type>;

    /// `ref T`
    fn by_reference(&mut self, element: Self::Type) -> Result<Self::Type>;

    /// `T*`
    fn pointer(&mut self, element: Self::Type) -> Result<Self::Type>;

    /// A pinned local.
    fn pinned(&mut self, element: Self::Type) -> Result<Self::Type>;

    /// `G<A, B>`
    fn generic_instantiation(
        &mut self,
        generic: Self::Type,
        arguments: Vec<Self::Type>,
    ) -> Result<Self::Type>;

    /// `!index`, a type parameter of the enclosing type.
    fn generic_type_parameter(&mut self, index: u32) -> Result<Self::Type>;

    /// `!!index`, a type parameter of the enclosing method.
    fn generic_method_parameter(&mut self, index: u32) -> Result<Self::Type>;

    /// `modreq`/`modopt` applied to a type.
    fn modified(
        &mut self,
        modifier: Self::Type,
        unmodified: Self::Type,
        is_required: bool,
    ) -> Result<Self::Type>;

    /// `method ret *(params)`
    fn function_pointer(&mut self, signature: MethodSignature<Self::Type>) -> Result<Self::Type>;
}

/// Walks one signature blob and drives a [`SignatureTypeProvider`].
///
/// A decoder is created per blob and not reused.
///
/// # Example
///
/// ```rust
/// use usagescope::metadata::signatures::{SignatureDecoder, StringTestProvider};
///
/// // static int32 M(string)
/// let mut provider = StringTestProvider;
/// let mut decoder = SignatureDecoder::new(&[0x00, 0x01, 0x08, 0x0E], &mut provider);
/// let signature = decoder.decode_method_signature()?;
/// assert_eq!(signature.return_type, "Int32");
/// assert_eq!(signature.parameter_types, vec!["String".to_string()]);
/// # Ok::<(), usagescope::Error>(())
/// ```
pub struct SignatureDecoder<'a, 'p, P> {
    parser: Parser<'a>,
    provider: &'p mut P,
    depth: usize,
}

impl<'a, 'p, P: SignatureTypeProvider> SignatureDecoder<'a, 'p, P> {
    /// Creates a decoder over `data` reporting to `provider`.
    pub fn new(data: &'a [u8], provider: &'p mut P) -> Self {
        SignatureDecoder {
            parser: Parser::new(data),
            provider,
            depth: 0,
        }
    }

    /// Decodes a bare type, as found in a `TypeSpec` blob.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed or truncated data, nesting deeper than
    /// [`MAX_RECURSION_DEPTH`], or an error from the provider.
    pub fn decode_type(&mut self) -> Result<P::Type> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            return Err(RecursionLimit(MAX_RECURSION_DEPTH));
        }

        let result = self.decode_type_inner();
        self.depth -= 1;
        result
    }

    fn decode_type_inner(&mut self) -> Result<P::Type> {
        let element_type = self.parser.read_le::<u8>()?;

        if let Some(code) = PrimitiveTypeCode::from_element_type(element_type) {
            return self.provider.primitive(code);
        }

        match element_type {
            ELEMENT_TYPE::CLASS | ELEMENT_TYPE::VALUETYPE => self.decode_handle(element_type),
            ELEMENT_TYPE::PTR => {
                let element = self.decode_type()?;
                self.provider.pointer(element)
            }
            ELEMENT_TYPE::BYREF => {
                let element = self.decode_type()?;
                self.provider.by_reference(element)
            }
            ELEMENT_TYPE::PINNED => {
                let element = self.decode_type()?;
                self.provider.pinned(element)
            }
            ELEMENT_TYPE::SZARRAY => {
                let element = self.decode_type()?;
                self.provider.sz_array(element)
            }
            ELEMENT_TYPE::ARRAY => {
                let element = self.decode_type()?;
                let shape = self.decode_array_shape()?;
                self.provider.array(element, &shape)
            }
            ELEMENT_TYPE::GENERICINST => {
                let generic = self.decode_type()?;
                let count = self.parser.read_compressed_uint()?;
                if count == 0 {
                    return Err(malformed_error!("GENERICINST without arguments"));
                }

                let mut arguments = Vec::with_capacity(count.min(64) as usize);
                for _ in 0..count {
                    arguments.push(self.decode_type()?);
                }

                self.provider.generic_instantiation(generic, arguments)
            }
            ELEMENT_TYPE::VAR => {
                let index = self.parser.read_compressed_uint()?;
                self.provider.generic_type_parameter(index)
            }
            ELEMENT_TYPE::MVAR => {
                let index = self.parser.read_compressed_uint()?;
                self.provider.generic_method_parameter(index)
            }
            ELEMENT_TYPE::CMOD_REQD | ELEMENT_TYPE::CMOD_OPT => {
                let modifier = self.decode_handle(0)?;
                let unmodified = self.decode_type()?;
                self.provider.modified(
                    modifier,
                    unmodified,
                    element_type == ELEMENT_TYPE::CMOD_REQD,
                )
            }
            ELEMENT_TYPE::FNPTR => {
                let signature = self.decode_method_signature()?;
                self.provider.function_pointer(signature)
            }
            _ => Err(malformed_error!(
                "Unsupported ELEMENT_TYPE - {}",
                element_type
            )),
        }
    }

    fn decode_handle(&mut self, raw_kind: u8) -> Result<P::Type> {
        let token = self.parser.read_compressed_token()?;

        match token.table_id() {
            Some(TableId::TypeDef) => self.provider.type_definition(token, raw_kind),
            Some(TableId::TypeRef) => self.provider.type_reference(token, raw_kind),
            Some(TableId::TypeSpec) => self.provider.type_specification(token, raw_kind),
            _ => Err(malformed_error!("Invalid type handle - {}", token)),
        }
    }

    fn decode_array_shape(&mut self) -> Result<ArrayShape> {
        let rank = self.parser.read_compressed_uint()?;
        if rank == 0 {
            return Err(malformed_error!("Array of rank 0"));
        }

        let num_sizes = self.parser.read_compressed_uint()?;
        if num_sizes > rank {
            return Err(malformed_error!("Array with {} sizes for rank {}", num_sizes, rank));
        }
        let mut sizes = Vec::with_capacity(num_sizes as usize);
        for _ in 0..num_sizes {
            sizes.push(self.parser.read_compressed_uint()?);
        }

        let num_lo_bounds = self.parser.read_compressed_uint()?;
        if num_lo_bounds > rank {
            return Err(malformed_error!(
                "Array with {} lower bounds for rank {}",
                num_lo_bounds,
                rank
            ));
        }
        let mut lower_bounds = Vec::with_capacity(num_lo_bounds as usize);
        for _ in 0..num_lo_bounds {
            lower_bounds.push(self.parser.read_compressed_int()?);
        }

        Ok(ArrayShape {
            rank,
            sizes,
            lower_bounds,
        })
    }

    /// Reads the header byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is empty.
    pub fn read_header(&mut self) -> Result<SignatureHeader> {
        Ok(SignatureHeader(self.parser.read_le::<u8>()?))
    }

    /// Decodes a field signature (`FIELD` header, then the type).
    ///
    /// Leading custom modifiers become [`SignatureTypeProvider::modified`] shapes.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is not `FIELD` or the type is malformed.
    pub fn decode_field_signature(&mut self) -> Result<P::Type> {
        let header = self.read_header()?;
        if header.kind() != SignatureKind::Field {
            return Err(malformed_error!(
                "SignatureField - invalid start - {}",
                header.0
            ));
        }

        self.decode_type()
    }

    /// Decodes a method or property signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is neither a method nor a property, a second vararg
    /// sentinel shows up, or any type is malformed.
    pub fn decode_method_signature(&mut self) -> Result<MethodSignature<P::Type>> {
        let header = self.read_header()?;
        if !matches!(header.kind(), SignatureKind::Method | SignatureKind::Property) {
            return Err(malformed_error!(
                "Expected a method or property signature - {}",
                header.0
            ));
        }

        let generic_parameter_count = if header.is_generic() {
            self.parser.read_compressed_uint()?
        } else {
            0
        };

        let parameter_count = self.parser.read_compressed_uint()? as usize;
        let return_type = self.decode_type()?;

        let mut parameter_types = Vec::with_capacity(parameter_count.min(64));
        let mut required_parameter_count = parameter_count;
        let mut seen_sentinel = false;
        for index in 0..parameter_count {
            if self.parser.peek_byte()? == ELEMENT_TYPE::SENTINEL {
                if seen_sentinel {
                    return Err(malformed_error!("Second vararg sentinel"));
                }
                self.parser.advance_by(1)?;
                seen_sentinel = true;
                required_parameter_count = index;
            }

            parameter_types.push(self.decode_type()?);
        }

        Ok(MethodSignature {
            header,
            generic_parameter_count,
            required_parameter_count,
            return_type,
            parameter_types,
        })
    }
}

/// A provider that renders simple names, for examples and tests.
#[doc(hidden)]
pub struct StringTestProvider;

impl SignatureTypeProvider for StringTestProvider {
    type Type = String;

    fn primitive(&mut self, code: PrimitiveTypeCode) -> Result<String> {
        Ok(code.name().to_string())
    }

    fn type_definition(&mut self, token: Token, _raw_kind: u8) -> Result<String> {
        Ok(format!("def({token})"))
    }

    fn type_reference(&mut self, token: Token, _raw_kind: u8) -> Result<String> {
        Ok(format!("ref({token})"))
    }

    fn type_specification(&mut self, token: Token, _raw_kind: u8) -> Result<String> {
        Ok(format!("spec({token})"))
    }

    fn sz_array(&mut self, element: String) -> Result<String> {
        Ok(element + "[]")
    }

    fn array(&mut self, element: String, shape: &ArrayShape) -> Result<String> {
        Ok(format!("{element}[{}]", shape.rank))
    }

    fn by_reference(&mut self, element: String) -> Result<String> {
        Ok(element + "&")
    }

    fn pointer(&mut self, element: String) -> Result<String> {
        Ok(element + "*")
    }

    fn pinned(&mut self, element: String) -> Result<String> {
        Ok(format!("pinned {element}"))
    }

    fn generic_instantiation(&mut self, generic: String, arguments: Vec<String>) -> Result<String> {
        Ok(format!("{generic}<{}>", arguments.join(",")))
    }

    fn generic_type_parameter(&mut self, index: u32) -> Result<String> {
        Ok(format!("!{index}"))
    }

    fn generic_method_parameter(&mut self, index: u32) -> Result<String> {
        Ok(format!("!!{index}"))
    }

    fn modified(&mut self, modifier: String, unmodified: String, is_required: bool) -> Result<String> {
        let kind = if is_required { "modreq" } else { "modopt" };
        Ok(format!("{unmodified} {kind}({modifier})"))
    }

    fn function_pointer(&mut self, signature: MethodSignature<String>) -> Result<String> {
        Ok(format!(
            "fnptr {}({})",
            signature.return_type,
            signature.parameter_types.join(",")
        ))
    }
}
