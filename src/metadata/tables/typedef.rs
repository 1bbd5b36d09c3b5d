use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

#[allow(non_snake_case)]
/// Flags of a type definition (II.23.1.15). Only the ones this crate inspects.
pub mod TypeAttributes {
    /// Mask for the visibility bits.
    pub const VISIBILITY_MASK: u32 = 0x0000_0007;
    /// Nested, public.
    pub const NESTED_PUBLIC: u32 = 0x0000_0002;
    /// Mask for class semantics.
    pub const CLASS_SEMANTICS_MASK: u32 = 0x0000_0020;
    /// The type is an interface.
    pub const INTERFACE: u32 = 0x0000_0020;
    /// The type is abstract.
    pub const ABSTRACT: u32 = 0x0000_0080;
    /// The type is sealed.
    pub const SEALED: u32 = 0x0000_0100;
}

/// A row of the `TypeDef` table (0x02): a type defined in this module.
///
/// `field_list` and `method_list` start the type's run of fields and methods; the run ends
/// where the next row's run starts.
#[derive(Clone, Debug)]
pub struct TypeDefRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// `TypeAttributes` bits.
    pub flags: u32,
    /// `#Strings` index of the name.
    pub type_name: u32,
    /// `#Strings` index of the namespace.
    pub type_namespace: u32,
    /// The base type (`TypeDefOrRef`), nil for interfaces and `System.Object`.
    pub extends: CodedIndex,
    /// First row in `Field` (or `FieldPtr`).
    pub field_list: u32,
    /// First row in `MethodDef` (or `MethodPtr`).
    pub method_list: u32,
}

impl TypeDefRaw {
    /// Returns `true` if the type is an interface.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags & TypeAttributes::CLASS_SEMANTICS_MASK == TypeAttributes::INTERFACE
    }

    /// Returns `true` if the visibility bits mark a nested type.
    #[must_use]
    pub fn is_nested_visibility(&self) -> bool {
        self.flags & TypeAttributes::VISIBILITY_MASK >= TypeAttributes::NESTED_PUBLIC
    }
}

impl RowReadable for TypeDefRaw {
    const TABLE: TableId = TableId::TypeDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeDefRaw {
            rid,
            token: Token::from_parts(TableId::TypeDef, rid),
            flags: read_le_at::<u32>(data, offset)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            extends: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
            method_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
        })
    }
}
