//! PE container access.
//!
//! A managed module is an ordinary PE/COFF image whose CLR runtime header data directory
//! points at the managed metadata. This module owns the raw bytes of such an image, parses the
//! PE structure with `goblin`, and offers bounds-checked reads plus RVA translation for the
//! metadata layer on top.
//!
//! # Backends
//!
//! The bytes come from a [`Backend`]: either a memory buffer or a memory-mapped file. Callers
//! can supply their own implementation through [`File::from_backend`].

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr, NotAModule},
    Result,
};
use goblin::pe::{section_table::SectionTable, PE};
use ouroboros::self_referencing;

pub use memory::Memory;
pub use physical::Physical;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of PE data, allowing for both in-memory and on-disk
/// representations. All implementations must be thread-safe so that an opened module can be
/// handed to a worker thread.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

#[self_referencing]
/// A loaded PE image that carries a CLR runtime header.
///
/// The struct owns its [`Backend`] and the `goblin` view borrowing from it. Nothing here knows
/// about metadata tables; it only answers "where in the file is RVA x" and "give me these bytes".
pub struct File {
    /// The underlying data source (memory or file).
    data: Box<dyn Backend>,
    /// The parsed PE structure, referencing the data.
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Loads a PE file from the given path. The file is memory-mapped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be mapped, is empty, isn't a PE image, or lacks a CLR
    /// runtime header directory.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::from_backend(input)
    }

    /// Loads a PE file from a memory buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is empty, isn't a PE image, or lacks a CLR runtime header
    /// directory.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        Self::from_backend(Memory::new(data))
    }

    /// Loads a PE file from any [`Backend`].
    ///
    /// # Errors
    ///
    /// Returns an error if the data is empty, not a valid PE, or missing the CLR runtime header.
    pub fn from_backend<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data: Box<dyn Backend> = Box::new(data);

        File::try_new(data, |data| match PE::parse(data.data()) {
            Ok(pe) => match pe.header.optional_header {
                Some(optional_header) => {
                    match optional_header.data_directories.get_clr_runtime_header() {
                        Some(clr) if clr.virtual_address != 0 && clr.size != 0 => Ok(pe),
                        _ => Err(NotAModule("no CLR runtime header directory".to_string())),
                    }
                }
                None => Err(NotAModule("no optional header".to_string())),
            },
            Err(error) => Err(GoblinErr(error)),
        })
    }

    /// Returns the total size of the loaded file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the file has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the RVA and size of the CLR runtime header.
    ///
    /// Presence of the directory was checked at load time; `(0, 0)` can't be observed on a
    /// successfully constructed `File`.
    #[must_use]
    pub fn clr(&self) -> (usize, usize) {
        self.with_pe(|pe| {
            let Some(optional_header) = pe.header.optional_header else {
                return (0, 0);
            };

            match optional_header.data_directories.get_clr_runtime_header() {
                Some(dir) => (dir.virtual_address as usize, dir.size as usize),
                None => (0, 0),
            }
        })
    }

    /// Returns an iterator over the section headers of the PE file.
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.with_pe(|pe| pe.sections.iter())
    }

    /// Returns the whole image.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns a bounds-checked slice of the image.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested range is out of bounds.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Converts a relative virtual address (RVA) to a file offset.
    ///
    /// # Errors
    ///
    /// Returns an error if no section contains the RVA, or if a section header overflows.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let Some(section_max) = section.virtual_address.checked_add(section.virtual_size)
                else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        section.virtual_size
                    ));
                };

                if section.virtual_address <= rva_u32 && section_max > rva_u32 {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }
}
