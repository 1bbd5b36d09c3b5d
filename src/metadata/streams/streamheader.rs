use crate::{file::io::read_le, Result};

/// One entry of the stream directory that follows the metadata root.
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.2
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root.
    pub offset: u32,
    /// Size of the stream in bytes.
    pub size: u32,
    /// Name of the stream, e.g. `#~` or `#Strings`.
    pub name: String,
}

impl StreamHeader {
    /// Longest stream name accepted, including the terminator.
    pub const MAX_NAME: usize = 32;

    /// Reads a stream header at the start of `data`.
    ///
    /// Unknown stream names are accepted; producers and obfuscators add their own streams and
    /// the reader only looks up the ones it knows.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is truncated or the name has no terminator within 32
    /// bytes.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let name_bytes = &data[8..data.len().min(8 + Self::MAX_NAME)];
        let Some(name_len) = name_bytes.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!("Stream header name is not terminated"));
        };

        let name = String::from_utf8_lossy(&name_bytes[..name_len]).into_owned();

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }

    /// Size of this header on disk: 8 bytes plus the name padded to 4.
    #[must_use]
    pub fn header_size(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}
