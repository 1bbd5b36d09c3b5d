use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        method::{MethodAttributes, MethodImplAttributes},
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `MethodDef` table (0x06).
#[derive(Clone, Debug)]
pub struct MethodDefRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// RVA of the method body, 0 if there is none.
    pub rva: u32,
    /// `MethodImplAttributes` bits.
    pub impl_flags: u16,
    /// `MethodAttributes` bits.
    pub flags: u16,
    /// `#Strings` index of the name.
    pub name: u32,
    /// `#Blob` index of the method signature.
    pub signature: u32,
    /// First row in `Param`.
    pub param_list: u32,
}

impl MethodDefRaw {
    /// The method attribute flags.
    #[must_use]
    pub fn attributes(&self) -> MethodAttributes {
        MethodAttributes::from_bits_retain(self.flags)
    }

    /// The implementation flags.
    #[must_use]
    pub fn impl_attributes(&self) -> MethodImplAttributes {
        MethodImplAttributes::from_bits_retain(self.impl_flags)
    }
}

impl RowReadable for MethodDefRaw {
    const TABLE: TableId = TableId::MethodDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodDefRaw {
            rid,
            token: Token::from_parts(TableId::MethodDef, rid),
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            param_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Param))?,
        })
    }
}

/// A row of the `MethodPtr` table (0x05), present in unoptimized metadata only.
#[derive(Clone, Debug)]
pub struct MethodPtrRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The `MethodDef` row this entry stands for.
    pub method: u32,
}

impl RowReadable for MethodPtrRaw {
    const TABLE: TableId = TableId::MethodPtr;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodPtrRaw {
            rid,
            method: read_le_at_dyn(data, offset, sizes.is_large(TableId::MethodDef))?,
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
            0x50, 0x20, 0x00, 0x00, // rva
            0x00, 0x10, // impl_flags
            0xD6, 0x05, // flags
            0x10, 0x00, // name
            0x20, 0x00, // signature
            0x01, 0x00, // param_list
        ];

        let sizes = TableInfo::new_test(&[(TableId::MethodDef, 1)], false, false, false);
        let table = MetadataTable::<MethodDefRaw>::new(&data, 1, &sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.token.value(), 0x0600_0001);
        assert_eq!(row.rva, 0x2050);
        assert!(row
            .impl_attributes()
            .contains(MethodImplAttributes::INTERNAL_CALL));
        assert!(row.attributes().contains(MethodAttributes::VIRTUAL));
        assert!(row.attributes().contains(MethodAttributes::STATIC));
        assert!(row.attributes().contains(MethodAttributes::ABSTRACT));
        assert_eq!(row.signature, 0x20);
    }
}
