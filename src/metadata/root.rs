//! The metadata root (II.24.2.1).

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Result,
};

/// Magic signature at the start of the metadata root: `BSJB`.
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Upper bound on the number of stream headers accepted.
const MAX_STREAMS: u16 = 16;

/// The metadata root: version string and stream directory.
pub struct Root {
    /// Always [`CIL_HEADER_MAGIC`].
    pub signature: u32,
    /// Major version of the metadata format.
    pub major_version: u16,
    /// Minor version of the metadata format.
    pub minor_version: u16,
    /// The runtime version string, e.g. `v4.0.30319`.
    pub version: String,
    /// Reserved flags.
    pub flags: u16,
    /// The stream directory.
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parses the metadata root at the start of `data` (the whole metadata block).
    ///
    /// Every stream header is checked to lie within `data`.
    ///
    /// # Errors
    ///
    /// Returns an error on a signature mismatch, truncated data, or streams outside the block.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(out_of_bounds_error!());
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let version_length = read_le::<u32>(&data[12..])? as usize;
        let Some(version_bytes) = data.get(16..16_usize.saturating_add(version_length)) else {
            return Err(out_of_bounds_error!());
        };

        let version_end = version_bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..version_end]).into_owned();

        let mut offset = 16 + version_length;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 || stream_count > MAX_STREAMS {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count));
        for _ in 0..stream_count {
            let Some(header_data) = data.get(offset..) else {
                return Err(out_of_bounds_error!());
            };

            let stream = StreamHeader::from(header_data)?;
            match stream.offset.checked_add(stream.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(out_of_bounds_error!()),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        stream.offset,
                        stream.size
                    ))
                }
            }

            offset += stream.header_size();
            stream_headers.push(stream);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            version,
            flags,
            stream_headers,
        })
    }

    /// Looks up a stream header by name. The first match wins.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|stream| stream.name == name)
    }
}
