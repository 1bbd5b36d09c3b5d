//! Types of the custom attribute value decoder.

use crate::metadata::signatures::PrimitiveTypeCode;

/// .NET `CorSerializationType` constants as defined in corhdr.h
#[allow(non_snake_case, missing_docs)]
pub mod SERIALIZATION_TYPE {
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const SZARRAY: u8 = 0x1D;
    pub const TYPE: u8 = 0x50;
    pub const TAGGED_OBJECT: u8 = 0x51;
    pub const FIELD: u8 = 0x53;
    pub const PROPERTY: u8 = 0x54;
    pub const ENUM: u8 = 0x55;
}

/// Whether a named argument sets a field or a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedArgumentKind {
    /// `FIELD` (0x53)
    Field,
    /// `PROPERTY` (0x54)
    Property,
}

/// One named argument of an attribute. The value is consumed, not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedArgument {
    /// Field or property.
    pub kind: NamedArgumentKind,
    /// The member name; `None` if the blob stores a null string.
    pub name: Option<String>,
}

/// The type of a single (non-array) value in an attribute blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// A fixed-width number, `bool`, `char`, or a `string`.
    Primitive(PrimitiveTypeCode),
    /// A `System.Type`, stored as its assembly-qualified name.
    Type,
    /// A `System.Object`: the value is prefixed with its own type.
    TaggedObject,
    /// A type whose values can't be sized, such as an enum whose underlying type could not be
    /// resolved. Reading a value of it aborts the decode.
    Unknown,
}

/// The type of a fixed or named argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentType {
    /// A single value.
    Element(ElementKind),
    /// A single-dimensional array of values.
    SzArray(ElementKind),
}

impl ElementKind {
    /// Maps an element type byte in `BOOLEAN..=STRING` to its primitive.
    #[must_use]
    pub fn from_primitive_byte(code: u8) -> Option<ElementKind> {
        if (SERIALIZATION_TYPE::BOOLEAN..=SERIALIZATION_TYPE::STRING).contains(&code) {
            PrimitiveTypeCode::from_element_type(code).map(ElementKind::Primitive)
        } else {
            None
        }
    }

    /// The kind of an enum with the given underlying type; integral types only.
    #[must_use]
    pub fn from_enum_underlying(code: Option<PrimitiveTypeCode>) -> ElementKind {
        match code {
            Some(
                code @ (PrimitiveTypeCode::SByte
                | PrimitiveTypeCode::Byte
                | PrimitiveTypeCode::Int16
                | PrimitiveTypeCode::UInt16
                | PrimitiveTypeCode::Int32
                | PrimitiveTypeCode::UInt32
                | PrimitiveTypeCode::Int64
                | PrimitiveTypeCode::UInt64),
            ) => ElementKind::Primitive(code),
            _ => ElementKind::Unknown,
        }
    }
}
