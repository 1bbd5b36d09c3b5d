//! Header of the `#~` tables stream (II.24.2.6).
//!
//! The header declares which tables are present, their row counts, and the heap index widths.
//! From that this module computes where each table's rows start inside the stream. The header
//! keeps offsets, not slices, so it can be owned by the module reader next to the bytes.

use strum::EnumCount;

use crate::{
    file::parser::Parser,
    metadata::tables::{MetadataTable, RowReadable, TableId, TableInfo},
    Error, Result,
};

/// Set in `HeapSizes` when an extra 4-byte value follows the row counts.
const EXTRA_DATA: u8 = 0x40;

#[derive(Clone, Copy, Debug, Default)]
struct TableLocation {
    offset: usize,
    len: usize,
    rows: u32,
}

/// The parsed `#~` header plus the location of every present table.
#[derive(Debug)]
pub struct TablesHeader {
    /// Major version of the table schema.
    pub major_version: u8,
    /// Minor version of the table schema.
    pub minor_version: u8,
    /// Bit vector of present tables.
    pub valid: u64,
    /// Bit vector of sorted tables.
    pub sorted: u64,
    /// Row counts and index widths.
    pub info: TableInfo,
    tables: [TableLocation; TableId::COUNT],
}

impl TablesHeader {
    /// Parses the header at the start of `data` (the whole `#~` stream).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if a table outside of ECMA-335 is marked present, since
    /// its row size is unknown and every table after it would be misplaced. Returns an error if
    /// the header or any table runs past the end of the stream.
    pub fn from(data: &[u8]) -> Result<TablesHeader> {
        let mut parser = Parser::new(data);

        let _reserved = parser.read_le::<u32>()?;
        let major_version = parser.read_le::<u8>()?;
        let minor_version = parser.read_le::<u8>()?;
        let heap_sizes = parser.read_le::<u8>()?;
        let _reserved = parser.read_le::<u8>()?;
        let valid = parser.read_le::<u64>()?;
        let sorted = parser.read_le::<u64>()?;

        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let mut row_counts = [0_u32; TableId::COUNT];
        for bit in 0..64_usize {
            if valid & (1_u64 << bit) == 0 {
                continue;
            }

            if bit >= TableId::COUNT {
                return Err(Error::NotSupported);
            }

            row_counts[bit] = parser.read_le::<u32>()?;
        }

        if heap_sizes & EXTRA_DATA != 0 {
            parser.advance_by(4)?;
        }

        let info = TableInfo::new(&row_counts, heap_sizes);

        let mut tables = [TableLocation::default(); TableId::COUNT];
        let mut offset = parser.pos();
        for (index, rows) in row_counts.iter().enumerate() {
            if *rows == 0 {
                continue;
            }

            let Some(table) = TableId::from_u8(index as u8) else {
                continue;
            };

            let Some(len) = (*rows as usize).checked_mul(info.row_size(table) as usize) else {
                return Err(out_of_bounds_error!());
            };
            let Some(end) = offset.checked_add(len) else {
                return Err(out_of_bounds_error!());
            };
            if end > data.len() {
                return Err(out_of_bounds_error!());
            }

            tables[index] = TableLocation {
                offset,
                len,
                rows: *rows,
            };
            offset = end;
        }

        Ok(TablesHeader {
            major_version,
            minor_version,
            valid,
            sorted,
            info,
            tables,
        })
    }

    /// Number of rows in `table`, 0 if absent.
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.tables[table as usize].rows
    }

    /// Returns a typed view of table `T`, given the bytes of the `#~` stream this header was
    /// parsed from. Absent tables yield an empty view.
    #[must_use]
    pub fn table<'a, T: RowReadable>(&'a self, stream: &'a [u8]) -> MetadataTable<'a, T> {
        let location = self.tables[T::TABLE as usize];
        let data = stream
            .get(location.offset..location.offset + location.len)
            .unwrap_or(&[]);

        MetadataTable::new(data, location.rows, &self.info)
            .unwrap_or_else(|_| MetadataTable::empty(&self.info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::TypeRefRaw;

    fn header(valid: u64, heap_sizes: u8, rows: &[u32]) -> Vec<u8> {
        let mut data = vec![0, 0, 0, 0, 2, 0, heap_sizes, 1];
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        for row in rows {
            data.extend_from_slice(&row.to_le_bytes());
        }
        data
    }

    #[test]
    fn locates_tables() {
        // Module (1 row) and TypeRef (2 rows)
        let mut data = header(0b11, 0, &[1, 2]);
        data.extend_from_slice(&[0; 10]);
        data.extend_from_slice(&[0x06, 0x00, 0x01, 0x00, 0x05, 0x00]);
        data.extend_from_slice(&[0x0A, 0x00, 0x09, 0x00, 0x05, 0x00]);

        let header = TablesHeader::from(&data).unwrap();
        assert_eq!(header.major_version, 2);
        assert_eq!(header.row_count(TableId::Module), 1);
        assert_eq!(header.row_count(TableId::TypeRef), 2);
        assert_eq!(header.row_count(TableId::TypeDef), 0);

        let typerefs = header.table::<TypeRefRaw>(&data);
        assert_eq!(typerefs.row_count(), 2);

        let second = typerefs.get(2).unwrap();
        assert_eq!(second.type_name, 9);
        assert_eq!(second.resolution_scope.tag, TableId::AssemblyRef);
        assert_eq!(second.resolution_scope.row, 2);
    }

    #[test]
    fn extra_data() {
        let mut data = header(0b1, EXTRA_DATA, &[1]);
        data.extend_from_slice(&[0xAA; 4]);
        data.extend_from_slice(&[0; 10]);

        let header = TablesHeader::from(&data).unwrap();
        assert_eq!(header.row_count(TableId::Module), 1);
    }

    #[test]
    fn truncated_table() {
        let mut data = header(0b10, 0, &[3]);
        data.extend_from_slice(&[0; 12]);

        assert!(matches!(
            TablesHeader::from(&data),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn unknown_table() {
        let data = header(1 << 0x30, 0, &[1]);
        assert!(matches!(TablesHeader::from(&data), Err(Error::NotSupported)));
    }
}
