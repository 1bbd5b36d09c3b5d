use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `Property` table (0x17).
#[derive(Clone, Debug)]
pub struct PropertyRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// `PropertyAttributes` bits.
    pub flags: u16,
    /// `#Strings` index of the name.
    pub name: u32,
    /// `#Blob` index of the property signature.
    pub signature: u32,
}

impl RowReadable for PropertyRaw {
    const TABLE: TableId = TableId::Property;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(PropertyRaw {
            rid,
            token: Token::from_parts(TableId::Property, rid),
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// A row of the `PropertyMap` table (0x15).
#[derive(Clone, Debug)]
pub struct PropertyMapRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The owning `TypeDef` row.
    pub parent: u32,
    /// First row in `Property` (or `PropertyPtr`).
    pub property_list: u32,
}

impl RowReadable for PropertyMapRaw {
    const TABLE: TableId = TableId::PropertyMap;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(PropertyMapRaw {
            rid,
            parent: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            property_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Property))?,
        })
    }
}

/// A row of the `PropertyPtr` table (0x16).
#[derive(Clone, Debug)]
pub struct PropertyPtrRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The `Property` row this entry stands for.
    pub property: u32,
}

impl RowReadable for PropertyPtrRaw {
    const TABLE: TableId = TableId::PropertyPtr;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(PropertyPtrRaw {
            rid,
            property: read_le_at_dyn(data, offset, sizes.is_large(TableId::Property))?,
        })
    }
}
