use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `MethodImpl` table (0x19): in `class`, `method_body` implements
/// `method_declaration`.
#[derive(Clone, Debug)]
pub struct MethodImplRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// The `TypeDef` row owning the override.
    pub class: u32,
    /// The implementing method (`MethodDefOrRef`).
    pub method_body: CodedIndex,
    /// The overridden declaration (`MethodDefOrRef`).
    pub method_declaration: CodedIndex,
}

impl RowReadable for MethodImplRaw {
    const TABLE: TableId = TableId::MethodImpl;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MethodImplRaw {
            rid,
            token: Token::from_parts(TableId::MethodImpl, rid),
            class: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            method_body: CodedIndex::read(data, offset, sizes, CodedIndexType::MethodDefOrRef)?,
            method_declaration: CodedIndex::read(
                data,
                offset,
                sizes,
                CodedIndexType::MethodDefOrRef,
            )?,
        })
    }
}
