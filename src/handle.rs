//! Per-entry cursors.
//!
//! An [`EntryHandle`] is plain caller-owned state: which entry, how long it
//! is, and where the next read starts. It holds no reference to the package,
//! so seeking and telling never touch shared state. After the package is
//! closed, outstanding handles must not be used again.

use std::io::{self, Read, Seek, SeekFrom};

use crate::package::PackageFile;
use crate::storage::Storage;

/// Origin for [`EntryHandle::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Start,
    Current,
    End,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryHandle {
    pub(crate) entry:    Option<usize>,
    pub(crate) size:     u64,
    pub(crate) position: u64,
}

impl EntryHandle {
    pub(crate) fn new(entry: usize, size: u64) -> Self {
        Self { entry: Some(entry), size, position: 0 }
    }

    /// Entry index, or `None` once closed.
    pub fn entry_index(&self) -> Option<usize> {
        self.entry
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn tell(&self) -> u64 {
        self.position
    }

    pub fn remaining(&self) -> u64 {
        self.size - self.position
    }

    pub fn is_open(&self) -> bool {
        self.entry.is_some()
    }

    /// Move the cursor. The destination saturates into `[0, size]`.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> u64 {
        let base = match origin {
            SeekOrigin::Start   => 0,
            SeekOrigin::Current => self.position as i128,
            SeekOrigin::End     => self.size as i128,
        };
        let dest = (base + offset as i128).clamp(0, self.size as i128);
        self.position = dest as u64;
        self.position
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn advance(&mut self, bytes: u64) {
        self.position = (self.position + bytes).min(self.size);
    }
}

/// `Read + Seek` view of one entry, borrowing a package opened for reading.
pub struct EntryReader<'a, S: Storage> {
    package: &'a PackageFile<S>,
    handle:  EntryHandle,
}

impl<'a, S: Storage> EntryReader<'a, S> {
    pub(crate) fn new(package: &'a PackageFile<S>, handle: EntryHandle) -> Self {
        Self { package, handle }
    }

    pub fn handle(&self) -> &EntryHandle {
        &self.handle
    }

    pub fn into_handle(self) -> EntryHandle {
        self.handle
    }
}

impl<S: Storage> Read for EntryReader<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.package
            .read_entry(&mut self.handle, buf)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl<S: Storage> Seek for EntryReader<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (offset, origin) = match pos {
            SeekFrom::Start(n) => (
                i64::try_from(n).unwrap_or(i64::MAX),
                SeekOrigin::Start,
            ),
            SeekFrom::Current(n) => (n, SeekOrigin::Current),
            SeekFrom::End(n)     => (n, SeekOrigin::End),
        };
        Ok(self.handle.seek(offset, origin))
    }
}
