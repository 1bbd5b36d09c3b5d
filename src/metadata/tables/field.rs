use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `Field` table (0x04).
#[derive(Clone, Debug)]
pub struct FieldRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// `FieldAttributes` bits.
    pub flags: u16,
    /// `#Strings` index of the name.
    pub name: u32,
    /// `#Blob` index of the field signature.
    pub signature: u32,
}

impl RowReadable for FieldRaw {
    const TABLE: TableId = TableId::Field;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(FieldRaw {
            rid,
            token: Token::from_parts(TableId::Field, rid),
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

/// A row of the `FieldPtr` table (0x03), present in unoptimized metadata only.
#[derive(Clone, Debug)]
pub struct FieldPtrRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The `Field` row this entry stands for.
    pub field: u32,
}

impl RowReadable for FieldPtrRaw {
    const TABLE: TableId = TableId::FieldPtr;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(FieldPtrRaw {
            rid,
            field: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
        })
    }
}
