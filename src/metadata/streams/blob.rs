use crate::{file::parser::Parser, Result};

/// The `#Blob` heap: length-prefixed binary values (signatures, attribute values, keys).
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.4
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wraps the heap bytes.
    #[must_use]
    pub fn from(data: &'a [u8]) -> Blob<'a> {
        Blob { data }
    }

    /// Returns the blob at `index`. Index 0 is the empty blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the index or the declared length runs past the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index == 0 {
            return Ok(&[]);
        }

        let Some(tail) = self.data.get(index..) else {
            return Err(out_of_bounds_error!());
        };

        let mut parser = Parser::new(tail);
        let len = parser.read_compressed_uint()? as usize;
        parser.read_bytes(len)
    }
}
