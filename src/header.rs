use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{truncated, PackageError, Result};

pub const MAGIC: &[u8; 4] = b"SPAK";
pub const FORMAT_VERSION: u32 = 1;
/// Serialized size of [`PackageHeader`]: magic(4) + version(4) + count(8) + offset(8).
pub const HEADER_SIZE: usize = 24;

/// Fixed record at offset 0 of every package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageHeader {
    pub magic:        [u8; 4],
    pub version:      u32,
    pub entry_count:  i64,
    /// Where the serialized entry table starts; also the next payload offset.
    pub table_offset: i64,
}

impl Default for PackageHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageHeader {
    /// Header of an empty package: no entries, table right after the header.
    pub fn new() -> Self {
        Self {
            magic:        *MAGIC,
            version:      FORMAT_VERSION,
            entry_count:  0,
            table_offset: HEADER_SIZE as i64,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_i64::<LittleEndian>(self.entry_count)?;
        writer.write_i64::<LittleEndian>(self.table_offset)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        // Writing into a correctly sized slice cannot fail.
        let _ = self.write(&mut buf[..]);
        buf
    }

    /// Decode without validating; see [`PackageHeader::validate`].
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic).map_err(truncated("header"))?;
        let version = reader.read_u32::<LittleEndian>().map_err(truncated("header"))?;
        let entry_count = reader.read_i64::<LittleEndian>().map_err(truncated("header"))?;
        let table_offset = reader.read_i64::<LittleEndian>().map_err(truncated("header"))?;
        Ok(Self { magic, version, entry_count, table_offset })
    }

    /// Structural checks. There is no compatibility with other versions.
    pub fn validate(&self) -> Result<()> {
        if &self.magic != MAGIC {
            return Err(PackageError::NotAPackage(format!(
                "bad magic {}", hex::encode(self.magic)
            )));
        }
        if self.version != FORMAT_VERSION {
            return Err(PackageError::NotAPackage(format!(
                "unsupported version {}", self.version
            )));
        }
        if self.entry_count < 0 {
            return Err(PackageError::NotAPackage(format!(
                "negative entry count {}", self.entry_count
            )));
        }
        if self.table_offset < HEADER_SIZE as i64 {
            return Err(PackageError::NotAPackage(format!(
                "table offset {} lies inside the header", self.table_offset
            )));
        }
        if self.entry_count > 0 && self.table_offset == HEADER_SIZE as i64 {
            return Err(PackageError::NotAPackage(format!(
                "table offset {} leaves no room for payloads", self.table_offset
            )));
        }
        Ok(())
    }
}
