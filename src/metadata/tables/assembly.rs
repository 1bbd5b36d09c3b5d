use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

#[allow(non_snake_case)]
/// Flags of an assembly or assembly reference (II.23.1.2).
pub mod AssemblyFlags {
    /// The public key blob holds the full key, not its token.
    pub const PUBLIC_KEY: u32 = 0x0001;
    /// The assembly can be retargeted at runtime.
    pub const RETARGETABLE: u32 = 0x0100;
}

/// A four-part assembly version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyVersion {
    /// Major version.
    pub major: u16,
    /// Minor version.
    pub minor: u16,
    /// Build number.
    pub build: u16,
    /// Revision number.
    pub revision: u16,
}

impl AssemblyVersion {
    /// Creates a version from its four parts.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        AssemblyVersion {
            major,
            minor,
            build,
            revision,
        }
    }

    fn read(data: &[u8], offset: &mut usize) -> Result<Self> {
        Ok(AssemblyVersion {
            major: read_le_at::<u16>(data, offset)?,
            minor: read_le_at::<u16>(data, offset)?,
            build: read_le_at::<u16>(data, offset)?,
            revision: read_le_at::<u16>(data, offset)?,
        })
    }
}

impl std::fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// The single row of the `Assembly` table (0x20). Its presence is what makes a module an
/// assembly.
#[derive(Clone, Debug)]
pub struct AssemblyRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// Hash algorithm id.
    pub hash_alg_id: u32,
    /// The assembly version.
    pub version: AssemblyVersion,
    /// `AssemblyFlags` bits.
    pub flags: u32,
    /// `#Blob` index of the public key.
    pub public_key: u32,
    /// `#Strings` index of the simple name.
    pub name: u32,
    /// `#Strings` index of the culture.
    pub culture: u32,
}

impl RowReadable for AssemblyRaw {
    const TABLE: TableId = TableId::Assembly;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(AssemblyRaw {
            rid,
            token: Token::from_parts(TableId::Assembly, rid),
            hash_alg_id: read_le_at::<u32>(data, offset)?,
            version: AssemblyVersion::read(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}

/// A row of the `AssemblyRef` table (0x23).
#[derive(Clone, Debug)]
pub struct AssemblyRefRaw {
    /// The 1-based row id.
    pub rid: u32,
    /// The token of this row.
    pub token: Token,
    /// The referenced version.
    pub version: AssemblyVersion,
    /// `AssemblyFlags` bits.
    pub flags: u32,
    /// `#Blob` index of the public key or its 8-byte token.
    pub public_key_or_token: u32,
    /// `#Strings` index of the simple name.
    pub name: u32,
    /// `#Strings` index of the culture.
    pub culture: u32,
    /// `#Blob` index of the hash value.
    pub hash_value: u32,
}

impl AssemblyRefRaw {
    /// Returns `true` if `public_key_or_token` holds a full public key.
    #[must_use]
    pub fn has_full_public_key(&self) -> bool {
        self.flags & AssemblyFlags::PUBLIC_KEY != 0
    }
}

impl RowReadable for AssemblyRefRaw {
    const TABLE: TableId = TableId::AssemblyRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfo) -> Result<Self> {
        Ok(AssemblyRefRaw {
            rid,
            token: Token::from_parts(TableId::AssemblyRef, rid),
            version: AssemblyVersion::read(data, offset)?,
            flags: read_le_at::<u32>(data, offset)?,
            public_key_or_token: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            culture: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            hash_value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}
