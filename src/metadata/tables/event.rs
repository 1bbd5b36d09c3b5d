use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A row of the `Event` table (0x14).
#[derive(Clone, Debug)]
pub struct EventRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// `EventAttributes` bits.
    pub flags: u16,
    /// `#Strings` index of the name.
    pub name: u32,
    /// The delegate type of the event (`TypeDefOrRef`).
    pub event_type: CodedIndex,
}

impl RowReadable for EventRaw {
    const TABLE: TableId = TableId::Event;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(EventRaw {
            rid,
            token: Token::from_parts(TableId::Event, rid),
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            event_type: CodedIndex::read(data, offset, sizes, CodedIndexType::TypeDefOrRef)?,
        })
    }
}

/// A row of the `EventMap` table (0x12): `parent` owns the events starting at `event_list`.
#[derive(Clone, Debug)]
pub struct EventMapRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The owning `TypeDef` row.
    pub parent: u32,
    /// First row in `Event` (or `EventPtr`).
    pub event_list: u32,
}

impl RowReadable for EventMapRaw {
    const TABLE: TableId = TableId::EventMap;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(EventMapRaw {
            rid,
            parent: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
            event_list: read_le_at_dyn(data, offset, sizes.is_large(TableId::Event))?,
        })
    }
}

/// A row of the `EventPtr` table (0x13).
#[derive(Clone, Debug)]
pub struct EventPtrRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The `Event` row this entry stands for.
    pub event: u32,
}

impl RowReadable for EventPtrRaw {
    const TABLE: TableId = TableId::EventPtr;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(EventPtrRaw {
            rid,
            event: read_le_at_dyn(data, offset, sizes.is_large(TableId::Event))?,
        })
    }
}
