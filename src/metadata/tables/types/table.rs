use std::marker::PhantomData;

use crate::{
    metadata::tables::{TableId, TableInfo},
    Result,
};

/// A typed row that can be read from its table's raw bytes.
pub trait RowReadable: Sized {
    /// The table this row type belongs to.
    const TABLE: TableId;

    /// Reads one row at `offset`, advancing it by the row size.
    ///
    /// # Arguments
    /// * `data`    - The raw bytes of the whole table
    /// * `offset`  - Start of the row, advanced past it
    /// * `rid`     - The 1-based row id, recorded on the row
    /// * `sizes`   - Index widths of the module
    ///
    /// # Errors
    ///
    /// Returns an error if the row is truncated or holds an invalid coded index.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self>;
}

/// A read-only view over the rows of one table.
///
/// Rows are decoded on access; nothing is cached.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    sizes: &'a TableInfo,
    _p: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Creates a view over `data`, which must hold `row_count` rows.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is too short for `row_count` rows.
    pub fn new(data: &'a [u8], row_count: u32, sizes: &'a TableInfo) -> Result<Self> {
        let row_size = sizes.row_size(T::TABLE);
        let needed = u64::from(row_count) * u64::from(row_size);
        if needed > data.len() as u64 {
            return Err(out_of_bounds_error!());
        }

        Ok(MetadataTable {
            data,
            row_count,
            row_size,
            sizes,
            _p: PhantomData,
        })
    }

    /// A table without rows.
    #[must_use]
    pub fn empty(sizes: &'a TableInfo) -> Self {
        MetadataTable {
            data: &[],
            row_count: 0,
            row_size: sizes.row_size(T::TABLE),
            sizes,
            _p: PhantomData,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Reads the row with 1-based id `rid`.
    ///
    /// # Errors
    ///
    /// Returns an error if `rid` is 0 or larger than the row count, or the row is malformed.
    pub fn get(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(malformed_error!(
                "Row {} out of range for {:?} ({} rows)",
                rid,
                T::TABLE,
                self.row_count
            ));
        }

        let mut offset = (rid as usize - 1) * self.row_size as usize;
        T::row_read(self.data, &mut offset, rid, self.sizes)
    }

    /// Iterates all rows in order, consuming the view.
    pub fn rows(self) -> impl Iterator<Item = Result<T>> + 'a
    where
        T: 'a,
    {
        (1..=self.row_count).map(move |rid| self.get(rid))
    }

    /// Iterates all rows in order.
    #[must_use]
    pub fn iter(&self) -> TableIterator<'_, 'a, T> {
        TableIterator {
            table: self,
            next_rid: 1,
        }
    }
}

/// Iterator over the rows of a [`MetadataTable`].
pub struct TableIterator<'t, 'a, T> {
    table: &'t MetadataTable<'a, T>,
    next_rid: u32,
}

impl<T: RowReadable> Iterator for TableIterator<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_rid > self.table.row_count {
            return None;
        }

        let rid = self.next_rid;
        self.next_rid += 1;
        Some(self.table.get(rid))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.table.row_count + 1).saturating_sub(self.next_rid) as usize;
        (left, Some(left))
    }
}

impl<'t, 'a, T: RowReadable> IntoIterator for &'t MetadataTable<'a, T> {
    type Item = Result<T>;
    type IntoIter = TableIterator<'t, 'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
