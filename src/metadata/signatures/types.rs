use strum::{EnumIter, IntoStaticStr};

#[allow(non_snake_case, dead_code, missing_docs)]
/// Possible bytes that represent various 'Types' for a signature - from coreclr
pub mod ELEMENT_TYPE {
    //Marks end of a list
    pub const END: u8 = 0x00;
    pub const VOID: u8 = 0x01;
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0a;
    pub const U8: u8 = 0x0b;
    pub const R4: u8 = 0x0c;
    pub const R8: u8 = 0x0d;
    pub const STRING: u8 = 0x0e;
    // Followed by type
    pub const PTR: u8 = 0x0f;
    // Followed by type
    pub const BYREF: u8 = 0x10;
    // Followed by TypeDef or TypeRef token
    pub const VALUETYPE: u8 = 0x11;
    // Followed by TypeDef or TypeRef token
    pub const CLASS: u8 = 0x12;
    // Generic parameter in a generic type definition, represented as number
    pub const VAR: u8 = 0x13;
    // type rank boundsCount bound1 … loCount lo1 …
    pub const ARRAY: u8 = 0x14;
    // Generic type instantiation. Followed by type type-arg-count type-1 ... type-n
    pub const GENERICINST: u8 = 0x15;
    pub const TYPEDBYREF: u8 = 0x16;
    // System.IntPtr
    pub const I: u8 = 0x18;
    // System.UIntPtr
    pub const U: u8 = 0x19;
    // Followed by full method signature
    pub const FNPTR: u8 = 0x1b;
    // System.Object
    pub const OBJECT: u8 = 0x1c;
    // Single-dim array with 0 lower bound
    pub const SZARRAY: u8 = 0x1d;
    // Generic parameter in a generic method definition,represented as number
    pub const MVAR: u8 = 0x1e;
    // Required modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_REQD: u8 = 0x1f;
    // Optional modifier : followed by a TypeDef or TypeRef token
    pub const CMOD_OPT: u8 = 0x20;
    // Implemented within the CLI
    pub const INTERNAL: u8 = 0x21;
    // Or’d with following element types
    pub const MODIFIER: u8 = 0x40;
    // Sentinel for vararg method signature
    pub const SENTINEL: u8 = 0x41;
    // Denotes a local variable that points at a pinned object
    pub const PINNED: u8 = 0x45;
}

/// The built-in types a signature can name with a single byte.
///
/// The variant names are the simple names of the corresponding `System` types, which is what
/// documentation IDs print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr, strum::Display)]
#[allow(missing_docs)]
pub enum PrimitiveTypeCode {
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    String,
    IntPtr,
    UIntPtr,
    Object,
    TypedReference,
    Void,
}

impl PrimitiveTypeCode {
    /// Maps an element type byte to its primitive, `None` for constructed types.
    #[must_use]
    pub fn from_element_type(element_type: u8) -> Option<PrimitiveTypeCode> {
        Some(match element_type {
            ELEMENT_TYPE::BOOLEAN => PrimitiveTypeCode::Boolean,
            ELEMENT_TYPE::CHAR => PrimitiveTypeCode::Char,
            ELEMENT_TYPE::I1 => PrimitiveTypeCode::SByte,
            ELEMENT_TYPE::U1 => PrimitiveTypeCode::Byte,
            ELEMENT_TYPE::I2 => PrimitiveTypeCode::Int16,
            ELEMENT_TYPE::U2 => PrimitiveTypeCode::UInt16,
            ELEMENT_TYPE::I4 => PrimitiveTypeCode::Int32,
            ELEMENT_TYPE::U4 => PrimitiveTypeCode::UInt32,
            ELEMENT_TYPE::I8 => PrimitiveTypeCode::Int64,
            ELEMENT_TYPE::U8 => PrimitiveTypeCode::UInt64,
            ELEMENT_TYPE::R4 => PrimitiveTypeCode::Single,
            ELEMENT_TYPE::R8 => PrimitiveTypeCode::Double,
            ELEMENT_TYPE::STRING => PrimitiveTypeCode::String,
            ELEMENT_TYPE::I => PrimitiveTypeCode::IntPtr,
            ELEMENT_TYPE::U => PrimitiveTypeCode::UIntPtr,
            ELEMENT_TYPE::OBJECT => PrimitiveTypeCode::Object,
            ELEMENT_TYPE::TYPEDBYREF => PrimitiveTypeCode::TypedReference,
            ELEMENT_TYPE::VOID => PrimitiveTypeCode::Void,
            _ => return None,
        })
    }

    /// The element type byte of this primitive.
    #[must_use]
    pub fn element_type(self) -> u8 {
        match self {
            PrimitiveTypeCode::Boolean => ELEMENT_TYPE::BOOLEAN,
            PrimitiveTypeCode::Char => ELEMENT_TYPE::CHAR,
            PrimitiveTypeCode::SByte => ELEMENT_TYPE::I1,
            PrimitiveTypeCode::Byte => ELEMENT_TYPE::U1,
            PrimitiveTypeCode::Int16 => ELEMENT_TYPE::I2,
            PrimitiveTypeCode::UInt16 => ELEMENT_TYPE::U2,
            PrimitiveTypeCode::Int32 => ELEMENT_TYPE::I4,
            PrimitiveTypeCode::UInt32 => ELEMENT_TYPE::U4,
            PrimitiveTypeCode::Int64 => ELEMENT_TYPE::I8,
            PrimitiveTypeCode::UInt64 => ELEMENT_TYPE::U8,
            PrimitiveTypeCode::Single => ELEMENT_TYPE::R4,
            PrimitiveTypeCode::Double => ELEMENT_TYPE::R8,
            PrimitiveTypeCode::String => ELEMENT_TYPE::STRING,
            PrimitiveTypeCode::IntPtr => ELEMENT_TYPE::I,
            PrimitiveTypeCode::UIntPtr => ELEMENT_TYPE::U,
            PrimitiveTypeCode::Object => ELEMENT_TYPE::OBJECT,
            PrimitiveTypeCode::TypedReference => ELEMENT_TYPE::TYPEDBYREF,
            PrimitiveTypeCode::Void => ELEMENT_TYPE::VOID,
        }
    }

    /// The simple name, e.g. `Int32`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// The kind nibble of a signature header (II.23.2.1 - II.23.2.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// Any method calling convention (default, C, stdcall, thiscall, fastcall, vararg).
    Method,
    /// `FIELD`
    Field,
    /// `LOCAL_SIG`
    LocalVariables,
    /// `PROPERTY`
    Property,
    /// `GENERICINST` of a `MethodSpec`.
    MethodSpecification,
    /// Anything else.
    Unknown,
}

/// The first byte of a method, field, property or local variable signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureHeader(pub u8);

impl SignatureHeader {
    /// The method carries a generic parameter count.
    pub const GENERIC: u8 = 0x10;
    /// The method has a `this` argument.
    pub const HAS_THIS: u8 = 0x20;
    /// `this` is passed explicitly.
    pub const EXPLICIT_THIS: u8 = 0x40;
    /// `VARARG` calling convention.
    pub const VARARG: u8 = 0x05;

    /// The kind encoded in the low nibble.
    #[must_use]
    pub fn kind(self) -> SignatureKind {
        match self.0 & 0x0F {
            0x00..=0x05 => SignatureKind::Method,
            0x06 => SignatureKind::Field,
            0x07 => SignatureKind::LocalVariables,
            0x08 => SignatureKind::Property,
            0x0A => SignatureKind::MethodSpecification,
            _ => SignatureKind::Unknown,
        }
    }

    /// Returns `true` for generic method signatures.
    #[must_use]
    pub fn is_generic(self) -> bool {
        self.0 & Self::GENERIC != 0
    }

    /// Returns `true` for instance methods and properties.
    #[must_use]
    pub fn has_this(self) -> bool {
        self.0 & Self::HAS_THIS != 0
    }

    /// Returns `true` for the vararg calling convention.
    #[must_use]
    pub fn is_vararg(self) -> bool {
        self.0 & 0x0F == Self::VARARG
    }
}

/// Rank, sizes and lower bounds of a general array (II.23.2.13).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayShape {
    /// Number of dimensions.
    pub rank: u32,
    /// Sizes of the leading dimensions that have one.
    pub sizes: Vec<u32>,
    /// Lower bounds of the leading dimensions that have one.
    pub lower_bounds: Vec<i32>,
}

/// A decoded method or property signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature<T> {
    /// The header byte.
    pub header: SignatureHeader,
    /// Number of generic parameters, 0 for non-generic methods.
    pub generic_parameter_count: u32,
    /// Number of parameters before the vararg sentinel; all of them without one.
    pub required_parameter_count: usize,
    /// The return type (the property type for property signatures).
    pub return_type: T,
    /// The parameter types, in order, vararg parameters included.
    pub parameter_types: Vec<T>,
}
