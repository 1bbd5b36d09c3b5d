use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `MemberRef` table (0x0A): a field or method referenced by signature.
///
/// The parent decides where the member lives: a `TypeRef` or `TypeSpec` for external members,
/// a `TypeDef` for members of this module, a `ModuleRef` for global members, or a `MethodDef`
/// for vararg call sites.
#[derive(Clone, Debug)]
pub struct MemberRefRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// `MemberRefParent` coded index.
    pub class: CodedIndex,
    /// `#Strings` index of the member name.
    pub name: u32,
    /// `#Blob` index of the field or method signature.
    pub signature: u32,
}

impl RowReadable for MemberRefRaw {
    const TABLE: TableId = TableId::MemberRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(MemberRefRaw {
            rid,
            token: Token::from_parts(TableId::MemberRef, rid),
            class: CodedIndex::read(data, offset, sizes, CodedIndexType::MemberRefParent)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            signature: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}
