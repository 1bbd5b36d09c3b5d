use crate::{
    file::io::read_le_at_dyn,
    metadata::tables::{RowReadable, TableId, TableInfo},
    Result,
};

/// A row of the `NestedClass` table (0x29): `nested_class` is declared inside
/// `enclosing_class`.
#[derive(Clone, Debug)]
pub struct NestedClassRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The nested `TypeDef` row.
    pub nested_class: u32,
    /// The enclosing `TypeDef` row.
    pub enclosing_class: u32,
}

impl RowReadable for NestedClassRaw {
    const TABLE: TableId = TableId::NestedClass;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        let is_large = sizes.is_large(TableId::TypeDef);

        Ok(NestedClassRaw {
            rid,
            nested_class: read_le_at_dyn(data, offset, is_large)?,
            enclosing_class: read_le_at_dyn(data, offset, is_large)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::MetadataTable;

    #[test]
    fn crafted_short() {
        let data = vec![0x05, 0x00, 0x02, 0x00];

        let sizes = TableInfo::new_test(&[(TableId::NestedClass, 1)], false, false, false);
        let table = MetadataTable::<NestedClassRaw>::new(&data, 1, &sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.nested_class, 5);
        assert_eq!(row.enclosing_class, 2);
    }
}
