use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `TypeRef` table (0x01): a type defined elsewhere.
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.22.38
#[derive(Clone, Debug)]
pub struct TypeRefRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// `Module`, `ModuleRef`, `AssemblyRef` or `TypeRef` (for nested types).
    pub resolution_scope: CodedIndex,
    /// `#Strings` index of the name.
    pub type_name: u32,
    /// `#Strings` index of the namespace.
    pub type_namespace: u32,
}

impl RowReadable for TypeRefRaw {
    const TABLE: TableId = TableId::TypeRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(TypeRefRaw {
            rid,
            token: Token::from_parts(TableId::TypeRef, rid),
            resolution_scope: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::ResolutionScope,
            )?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::MetadataTable;

    #[test]
    fn crafted_short() {
        let data = vec![
            0x0A, 0x00, // resolution_scope
            0x02, 0x02, // type_name
            0x03, 0x03, // type_namespace
        ];

        let sizes = TableInfo::new_test(&[(TableId::TypeRef, 1)], false, false, false);
        let table = MetadataTable::<TypeRefRaw>::new(&data, 1, &sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.rid, 1);
        assert_eq!(row.token.value(), 0x0100_0001);
        assert_eq!(row.resolution_scope, CodedIndex::new(TableId::AssemblyRef, 2));
        assert_eq!(row.type_name, 0x0202);
        assert_eq!(row.type_namespace, 0x0303);
    }

    #[test]
    fn crafted_long() {
        let data = vec![
            0x0B, 0x00, 0x00, 0x00, // resolution_scope
            0x02, 0x02, 0x02, 0x02, // type_name
            0x03, 0x03, 0x03, 0x03, // type_namespace
        ];

        let sizes = TableInfo::new_test(&[(TableId::TypeRef, u32::from(u16::MAX) + 3)], true, true, true);
        let table = MetadataTable::<TypeRefRaw>::new(&data, 1, &sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.resolution_scope, CodedIndex::new(TableId::TypeRef, 2));
        assert_eq!(row.type_name, 0x0202_0202);
        assert_eq!(row.type_namespace, 0x0303_0303);
        assert!(table.get(2).is_err());
    }
}
