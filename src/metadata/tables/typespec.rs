use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `TypeSpec` table (0x1B): a constructed type described by a signature blob.
#[derive(Clone, Debug)]
pub struct TypeSpecRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// `#Blob` index of the type signature.
    pub signature: u32,
}

impl RowReadable for TypeSpecRaw {
    const TABLE: TableId = TableId::TypeSpec;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeSpecRaw {
            rid,
            token: Token::from_parts(TableId::TypeSpec, rid),
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::MetadataTable;

    #[test]
    fn crafted_long() {
        let data = vec![0x01, 0x02, 0x03, 0x04];

        let sizes = TableInfo::new_test(&[(TableId::TypeSpec, 1)], false, true, false);
        let table = MetadataTable::<TypeSpecRaw>::new(&data, 1, &sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.token.value(), 0x1B00_0001);
        assert_eq!(row.signature, 0x0403_0201);
    }
}
