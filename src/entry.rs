use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::{truncated, PackageError, Result};
use crate::hash::HashTriple;
use crate::header::HEADER_SIZE;
use crate::path::{NAME_CAPACITY, MAX_NAME_LEN};

/// Serialized size of one [`FileEntry`]: name(260) + 3 hashes(12) + 3 × i64(24).
pub const ENTRY_SIZE: usize = NAME_CAPACITY + 12 + 24;

/// Metadata for one embedded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Normalized name, at most [`MAX_NAME_LEN`] bytes.
    pub name:          String,
    pub hashes:        HashTriple,
    pub original_size: i64,
    pub stored_size:   i64,
    pub offset:        i64,
}

impl FileEntry {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut name = [0u8; NAME_CAPACITY];
        let raw = self.name.as_bytes();
        let n = raw.len().min(MAX_NAME_LEN);
        name[..n].copy_from_slice(&raw[..n]);
        writer.write_all(&name)?;
        writer.write_u32::<LittleEndian>(self.hashes.a)?;
        writer.write_u32::<LittleEndian>(self.hashes.b)?;
        writer.write_u32::<LittleEndian>(self.hashes.c)?;
        writer.write_i64::<LittleEndian>(self.original_size)?;
        writer.write_i64::<LittleEndian>(self.stored_size)?;
        writer.write_i64::<LittleEndian>(self.offset)?;
        Ok(())
    }

    /// Decode one record. The name must be NUL-terminated UTF-8.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        let mut name = [0u8; NAME_CAPACITY];
        reader.read_exact(&mut name).map_err(truncated("entry table"))?;
        let a = reader.read_u32::<LittleEndian>().map_err(truncated("entry table"))?;
        let b = reader.read_u32::<LittleEndian>().map_err(truncated("entry table"))?;
        let c = reader.read_u32::<LittleEndian>().map_err(truncated("entry table"))?;
        let original_size = reader.read_i64::<LittleEndian>().map_err(truncated("entry table"))?;
        let stored_size = reader.read_i64::<LittleEndian>().map_err(truncated("entry table"))?;
        let offset = reader.read_i64::<LittleEndian>().map_err(truncated("entry table"))?;

        if name[NAME_CAPACITY - 1] != 0 {
            return Err(PackageError::NotAPackage("entry name is not NUL-terminated".into()));
        }
        let len = name.iter().position(|&b| b == 0).unwrap_or(NAME_CAPACITY - 1);
        let name = std::str::from_utf8(&name[..len])
            .map_err(|_| PackageError::NotAPackage("entry name is not UTF-8".into()))?
            .to_owned();

        Ok(Self {
            name,
            hashes: HashTriple { a, b, c },
            original_size,
            stored_size,
            offset,
        })
    }

    /// Record-level invariants; `table_offset` bounds the payload region.
    pub fn validate(&self, table_offset: i64) -> Result<()> {
        let bad = |why: String| Err(PackageError::NotAPackage(why));
        if self.name.is_empty() {
            return bad("entry with empty name".into());
        }
        if self.original_size <= 0 || self.stored_size <= 0 {
            return bad(format!("entry {} has non-positive size", self.name));
        }
        if self.offset < HEADER_SIZE as i64 {
            return bad(format!("entry {} starts inside the header", self.name));
        }
        match self.offset.checked_add(self.stored_size) {
            Some(end) if end <= table_offset => Ok(()),
            _ => bad(format!("entry {} overruns the entry table", self.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> FileEntry {
        FileEntry {
            name:          "textures/grass.dds".into(),
            hashes:        HashTriple { a: 1, b: 2, c: 3 },
            original_size: 100,
            stored_size:   100,
            offset:        HEADER_SIZE as i64,
        }
    }

    #[test]
    fn record_is_fixed_size() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        assert_eq!(buf.len(), ENTRY_SIZE);
        assert_eq!(buf[18], 0);
        assert_eq!(FileEntry::read(Cursor::new(&buf)).unwrap(), sample());
    }

    #[test]
    fn validate_checks_sizes_and_offsets() {
        let table_offset = HEADER_SIZE as i64 + 100;
        sample().validate(table_offset).unwrap();

        let mut e = sample();
        e.original_size = 0;
        assert!(e.validate(table_offset).is_err());

        let mut e = sample();
        e.offset = 4;
        assert!(e.validate(table_offset).is_err());

        assert!(sample().validate(table_offset - 1).is_err());

        let mut e = sample();
        e.name.clear();
        assert!(e.validate(table_offset).is_err());
    }

    #[test]
    fn unterminated_name_is_rejected() {
        let mut buf = Vec::new();
        sample().write(&mut buf).unwrap();
        buf[NAME_CAPACITY - 1] = b'x';
        assert!(FileEntry::read(Cursor::new(&buf)).unwrap_err().is_corrupt());
    }
}
