use bitflags::bitflags;

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// The role of an accessor method (II.23.1.12)
    pub struct MethodSemanticsAttributes: u16 {
        /// Property setter
        const SETTER = 0x0001;
        /// Property getter
        const GETTER = 0x0002;
        /// Other accessor of a property or event
        const OTHER = 0x0004;
        /// Event `add` accessor
        const ADD_ON = 0x0008;
        /// Event `remove` accessor
        const REMOVE_ON = 0x0010;
        /// Event `raise` accessor
        const FIRE = 0x0020;
    }
}

/// A row of the `MethodSemantics` table (0x18): `method` is an accessor of `association`.
#[derive(Clone, Debug)]
pub struct MethodSemanticsRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The accessor role.
    pub semantics: MethodSemanticsAttributes,
    /// The `MethodDef` row of the accessor.
    pub method: u32,
    /// The property or event (`HasSemantics`).
    pub association: CodedIndex,
}

impl RowReadable for MethodSemanticsRaw {
    const TABLE: TableId = TableId::MethodSemantics;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodSemanticsRaw {
            rid,
            semantics: MethodSemanticsAttributes::from_bits_retain(read_le_at::<u16>(
                data, offset,
            )?),
            method: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
            association: CodedIndex::read(data, offset, sizes, CodedIndexType::HasSemantics)?,
        })
    }
}
