//! The CLR runtime header (`IMAGE_COR20_HEADER`).
//!
//! The PE data directory entry 14 points here. The header locates the metadata root and,
//! for this crate's purposes, nothing else is needed from it; the remaining fields are kept
//! because they are cheap to read and help when inspecting odd images.

use crate::{file::parser::Parser, Result};

/// The 72-byte CLR runtime header.
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.25.3.3
#[allow(missing_docs)]
pub struct Cor20Header {
    pub cb: u32,
    pub major_runtime_version: u16,
    pub minor_runtime_version: u16,
    pub meta_data_rva: u32,
    pub meta_data_size: u32,
    pub flags: u32,
    pub entry_point_token: u32,
    pub resource_rva: u32,
    pub resource_size: u32,
    pub strong_name_signature_rva: u32,
    pub strong_name_signature_size: u32,
    pub code_manager_table_rva: u32,
    pub code_manager_table_size: u32,
    pub vtable_fixups_rva: u32,
    pub vtable_fixups_size: u32,
    pub export_address_table_jmp_rva: u32,
    pub export_address_table_jmp_size: u32,
    pub managed_native_header_rva: u32,
    pub managed_native_header_size: u32,
}

impl Cor20Header {
    /// Size of the header in bytes.
    pub const SIZE: usize = 72;

    /// Reads the header from the start of `data`.
    ///
    /// Only what is needed to reach the metadata is validated: the declared size and a
    /// non-empty metadata directory. Producers put all kinds of values into the reserved
    /// fields, and rejecting those would drop modules the runtime happily loads.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is shorter than 72 bytes, `cb` is smaller than 72, or the
    /// metadata directory is empty.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < Self::SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if (cb as usize) < Self::SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let header = Cor20Header {
            cb,
            major_runtime_version: parser.read_le::<u16>()?,
            minor_runtime_version: parser.read_le::<u16>()?,
            meta_data_rva: parser.read_le::<u32>()?,
            meta_data_size: parser.read_le::<u32>()?,
            flags: parser.read_le::<u32>()?,
            entry_point_token: parser.read_le::<u32>()?,
            resource_rva: parser.read_le::<u32>()?,
            resource_size: parser.read_le::<u32>()?,
            strong_name_signature_rva: parser.read_le::<u32>()?,
            strong_name_signature_size: parser.read_le::<u32>()?,
            code_manager_table_rva: parser.read_le::<u32>()?,
            code_manager_table_size: parser.read_le::<u32>()?,
            vtable_fixups_rva: parser.read_le::<u32>()?,
            vtable_fixups_size: parser.read_le::<u32>()?,
            export_address_table_jmp_rva: parser.read_le::<u32>()?,
            export_address_table_jmp_size: parser.read_le::<u32>()?,
            managed_native_header_rva: parser.read_le::<u32>()?,
            managed_native_header_size: parser.read_le::<u32>()?,
        };

        if header.meta_data_rva == 0 || header.meta_data_size == 0 {
            return Err(malformed_error!("Metadata directory is empty"));
        }

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(metadata_rva: u32, metadata_size: u32) -> Vec<u8> {
        let mut data = vec![0_u8; 72];
        data[0..4].copy_from_slice(&72_u32.to_le_bytes());
        data[4..6].copy_from_slice(&2_u16.to_le_bytes());
        data[6..8].copy_from_slice(&5_u16.to_le_bytes());
        data[8..12].copy_from_slice(&metadata_rva.to_le_bytes());
        data[12..16].copy_from_slice(&metadata_size.to_le_bytes());
        data[16..20].copy_from_slice(&1_u32.to_le_bytes());
        data
    }

    #[test]
    fn crafted() {
        let header = Cor20Header::read(&header_bytes(0x2050, 0x400)).unwrap();

        assert_eq!(header.cb, 72);
        assert_eq!(header.major_runtime_version, 2);
        assert_eq!(header.minor_runtime_version, 5);
        assert_eq!(header.meta_data_rva, 0x2050);
        assert_eq!(header.meta_data_size, 0x400);
        assert_eq!(header.flags, 1);
    }

    #[test]
    fn empty_metadata_directory() {
        assert!(Cor20Header::read(&header_bytes(0, 0x400)).is_err());
        assert!(Cor20Header::read(&header_bytes(0x2050, 0)).is_err());
    }

    #[test]
    fn truncated() {
        assert!(matches!(
            Cor20Header::read(&[0x48, 0, 0, 0]),
            Err(crate::Error::OutOfBounds { .. })
        ));
    }
}
