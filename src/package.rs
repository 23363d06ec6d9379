//! Package engine: one container, opened for reading or for writing.
//!
//! # Writing
//! A package opened with [`OpenMode::Write`] appends each new payload at the
//! current table offset and slides the table offset past it. The header and
//! the entry table only reach the file on [`PackageFile::flush`]; nothing is
//! journaled, so a crash between an insert and the next flush leaves the
//! on-disk table describing the previous state. A failed insert may leave
//! orphaned payload bytes, which the next insert overwrites.
//!
//! # Reading
//! A package opened with [`OpenMode::Read`] parses the header and table,
//! validates both, then builds the [`HashIndex`]. Lookups and reads take
//! `&self`, so one package can be shared across threads; the storage mutex is
//! held across every seek-then-read pair.
//!
//! # Layout
//! ```text
//! [0 .. 24)                      header
//! [24 .. table_offset)           payloads, in insertion order
//! [table_offset .. + n * 296)    entry table
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::entry::{FileEntry, ENTRY_SIZE};
use crate::error::{PackageError, Result};
use crate::handle::{EntryHandle, EntryReader, SeekOrigin};
use crate::hash::{HashOracle, HashTriple, StandardHashes};
use crate::hash_index::HashIndex;
use crate::header::PackageHeader;
use crate::path::{normalize, MAX_NAME_LEN};
use crate::storage::Storage;
use crate::table::{EntryTable, INITIAL_TABLE_CAPACITY};

/// Default buffer for streaming source files into a package: 64 KiB.
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 64 * 1024;

// ── Modes ────────────────────────────────────────────────────────────────────

/// How [`PackageFile::open`] should open a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    Closed,
    Read,
    Write,
}

impl From<OpenMode> for PackageState {
    fn from(mode: OpenMode) -> Self {
        match mode {
            OpenMode::Read  => PackageState::Read,
            OpenMode::Write => PackageState::Write,
        }
    }
}

// ── PackOptions ──────────────────────────────────────────────────────────────

/// Configuration for [`PackageFile::with_options`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Starting entry-table capacity for new packages.
    pub initial_capacity: usize,
    pub copy_buffer_size: usize,
    /// Must match the oracle the package was written with.
    pub hasher:           Arc<dyn HashOracle>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            initial_capacity: INITIAL_TABLE_CAPACITY,
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            hasher:           Arc::new(StandardHashes),
        }
    }
}

// ── EntryInfo ────────────────────────────────────────────────────────────────

/// Descriptor returned by [`PackageFile::list`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EntryInfo {
    pub index:       usize,
    pub name:        String,
    pub size:        u64,
    pub stored_size: u64,
    pub offset:      u64,
    pub hash_a:      u32,
    pub hash_b:      u32,
    pub hash_c:      u32,
}

impl EntryInfo {
    fn new(index: usize, e: &FileEntry) -> Self {
        EntryInfo {
            index,
            name:        e.name.clone(),
            size:        e.original_size as u64,
            stored_size: e.stored_size as u64,
            offset:      e.offset as u64,
            hash_a:      e.hashes.a,
            hash_b:      e.hashes.b,
            hash_c:      e.hashes.c,
        }
    }
}

// ── PackageFile ──────────────────────────────────────────────────────────────

pub struct PackageFile<S: Storage = File> {
    state:   PackageState,
    storage: Option<Mutex<S>>,
    path:    Option<PathBuf>,
    header:  PackageHeader,
    table:   EntryTable,
    index:   HashIndex,
    options: PackOptions,
    /// Inserts not yet written out by `flush`.
    pending: usize,
}

impl PackageFile<File> {
    pub fn new() -> Self {
        Self::with_options(PackOptions::default())
    }

    /// Open the package at `path`.
    ///
    /// Read mode requires an existing, valid package. Write mode opens an
    /// existing package for appending, or creates a new one.
    pub fn open<P: AsRef<Path>>(&mut self, path: P, mode: OpenMode) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(PackageError::InvalidArgument("empty package path"));
        }
        if self.state != PackageState::Closed {
            return Err(PackageError::AlreadyOpen);
        }

        let file = match mode {
            OpenMode::Read => File::open(path).map_err(|source| PackageError::OpenFailed {
                path: path.to_owned(),
                source,
            })?,
            OpenMode::Write => match OpenOptions::new().read(true).write(true).open(path) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::NotFound => OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(path)
                    .map_err(|source| PackageError::CreateFailed {
                        path: path.to_owned(),
                        source,
                    })?,
                Err(source) => {
                    return Err(PackageError::OpenFailed { path: path.to_owned(), source })
                }
            },
        };

        self.attach(file, mode)?;
        self.path = Some(path.to_owned());
        debug!(path = %path.display(), ?mode, "package opened");
        Ok(())
    }

    /// Path of the open package, if it was opened from the file system.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Default for PackageFile<File> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Storage> PackageFile<S> {
    pub fn with_options(mut options: PackOptions) -> Self {
        options.initial_capacity = options.initial_capacity.max(1);
        options.copy_buffer_size = options.copy_buffer_size.max(1);
        Self {
            state:   PackageState::Closed,
            storage: None,
            path:    None,
            header:  PackageHeader::new(),
            table:   EntryTable::new(),
            index:   HashIndex::default(),
            options,
            pending: 0,
        }
    }

    /// Open a package held in `storage`. In write mode an empty storage is
    /// initialised as a new package.
    pub fn open_storage(&mut self, storage: S, mode: OpenMode) -> Result<()> {
        if self.state != PackageState::Closed {
            return Err(PackageError::AlreadyOpen);
        }
        self.attach(storage, mode)
    }

    fn attach(&mut self, mut storage: S, mode: OpenMode) -> Result<()> {
        let len = storage.byte_len()?;

        let (header, table, index) = match mode {
            OpenMode::Read => {
                let (header, table) = parse(&mut storage, len).map_err(reject)?;
                let index = HashIndex::build(&table)?;
                (header, table, index)
            }
            OpenMode::Write if len == 0 => {
                let header = PackageHeader::new();
                storage.seek(SeekFrom::Start(0))?;
                header.write(&mut storage)?;
                let table = EntryTable::with_capacity(self.options.initial_capacity)?;
                (header, table, HashIndex::default())
            }
            OpenMode::Write => {
                let (header, mut table) = parse(&mut storage, len).map_err(reject)?;
                if table.capacity() < self.options.initial_capacity {
                    let mut grown = EntryTable::with_capacity(self.options.initial_capacity)?;
                    for entry in table.iter() {
                        grown.append(entry.clone())?;
                    }
                    table = grown;
                }
                (header, table, HashIndex::default())
            }
        };

        info!(?mode, entries = table.len(), "package ready");
        self.header  = header;
        self.table   = table;
        self.index   = index;
        self.storage = Some(Mutex::new(storage));
        self.state   = mode.into();
        self.pending = 0;
        Ok(())
    }

    /// Release everything. Safe to call in any state.
    ///
    /// Does not flush: inserts made since the last [`flush`](Self::flush)
    /// are not recorded in the on-disk table.
    pub fn close(&mut self) {
        if self.pending > 0 {
            warn!(
                unflushed = self.pending,
                "closing package with unflushed inserts; they will not be visible on reopen"
            );
        }
        if self.state != PackageState::Closed {
            debug!(state = ?self.state, "package closed");
        }
        self.state   = PackageState::Closed;
        self.storage = None;
        self.path    = None;
        self.header  = PackageHeader::new();
        self.table.clear();
        self.index   = HashIndex::default();
        self.pending = 0;
    }

    /// Release the package and hand back its storage.
    pub fn into_storage(mut self) -> Option<S> {
        let storage = self.storage.take().map(|m| m.into_inner());
        self.close();
        storage
    }

    // ── State ────────────────────────────────────────────────────────────────

    pub fn state(&self) -> PackageState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != PackageState::Closed
    }

    pub fn header(&self) -> Result<&PackageHeader> {
        if self.state == PackageState::Closed {
            return Err(PackageError::NotOpen);
        }
        Ok(&self.header)
    }

    /// Number of entries, including ones not yet flushed.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    fn require(&self, expected: PackageState) -> Result<()> {
        match self.state {
            PackageState::Closed => Err(PackageError::NotOpen),
            actual if actual != expected => Err(PackageError::ModeMismatch { expected, actual }),
            _ => Ok(()),
        }
    }

    fn storage_mut(&mut self) -> Result<&mut S> {
        self.storage
            .as_mut()
            .map(|m| m.get_mut())
            .ok_or(PackageError::NotOpen)
    }

    // ── Write ────────────────────────────────────────────────────────────────

    /// Insert the file at `disk_path`, named after the path itself.
    pub fn insert_entry<P: AsRef<Path>>(&mut self, disk_path: P) -> Result<usize> {
        let disk_path = disk_path.as_ref();
        let name = disk_path
            .to_str()
            .ok_or(PackageError::InvalidArgument("path is not valid UTF-8"))?;
        self.insert_entry_as(name, disk_path)
    }

    /// Insert the file at `disk_path` under the entry name `name`.
    pub fn insert_entry_as<P: AsRef<Path>>(&mut self, name: &str, disk_path: P) -> Result<usize> {
        let disk_path = disk_path.as_ref();
        let (name, hashes) = self.prepare_insert(name)?;

        let source = File::open(disk_path).map_err(|source| PackageError::OpenFailed {
            path: disk_path.to_owned(),
            source,
        })?;
        let size = source.metadata()?.len();
        self.append_payload(name, hashes, BufReader::new(source), size)
    }

    /// Insert an in-memory payload under `name`.
    pub fn insert_bytes(&mut self, name: &str, data: &[u8]) -> Result<usize> {
        let (name, hashes) = self.prepare_insert(name)?;
        self.append_payload(name, hashes, data, data.len() as u64)
    }

    fn prepare_insert(&self, name: &str) -> Result<(String, HashTriple)> {
        if name.is_empty() {
            return Err(PackageError::InvalidArgument("empty entry name"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(PackageError::NameTooLong { len: name.len(), max: MAX_NAME_LEN });
        }
        self.require(PackageState::Write)?;

        let name = normalize(name);
        let hashes = self.options.hasher.triple(&name);
        if self.table.position(&hashes).is_some() {
            return Err(PackageError::AlreadyExists(name));
        }
        Ok((name, hashes))
    }

    fn append_payload<R: Read>(
        &mut self,
        name:   String,
        hashes: HashTriple,
        source: R,
        size:   u64,
    ) -> Result<usize> {
        if size == 0 {
            return Err(PackageError::InvalidArgument("entry payload is empty"));
        }
        let stored_size = i64::try_from(size)
            .map_err(|_| PackageError::InvalidArgument("entry payload too large"))?;
        let offset = self.header.table_offset;
        let buffer_size = self.options.copy_buffer_size;

        let storage = self.storage_mut()?;
        storage.seek(SeekFrom::Start(offset as u64))?;
        let copied = {
            let mut writer = BufWriter::with_capacity(buffer_size, &mut *storage);
            let copied = io::copy(&mut source.take(size), &mut writer)?;
            writer.flush()?;
            copied
        };
        if copied != size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("source ended after {copied} of {size} bytes"),
            )
            .into());
        }

        debug!(name = %name, offset, size, "entry inserted");
        let index = self.table.append(FileEntry {
            name,
            hashes,
            original_size: stored_size,
            stored_size,
            offset,
        })?;
        self.header.entry_count += 1;
        self.header.table_offset += stored_size;
        self.pending += 1;
        Ok(index)
    }

    /// Write the header and the full entry table, then persist the storage.
    pub fn flush(&mut self) -> Result<()> {
        self.require(PackageState::Write)?;
        let header = self.header;
        let storage = self
            .storage
            .as_mut()
            .map(|m| m.get_mut())
            .ok_or(PackageError::NotOpen)?;

        storage.seek(SeekFrom::Start(0))?;
        header.write(&mut *storage)?;

        storage.seek(SeekFrom::Start(header.table_offset as u64))?;
        {
            let mut writer = BufWriter::new(&mut *storage);
            self.table.write_all(&mut writer)?;
            writer.flush()?;
        }
        storage.persist()?;

        debug!(entries = header.entry_count, table_offset = header.table_offset, "package flushed");
        self.pending = 0;
        Ok(())
    }

    // ── Read ─────────────────────────────────────────────────────────────────

    /// Look `path` up and return a handle positioned at its first byte.
    pub fn open_entry(&self, path: &str) -> Result<EntryHandle> {
        if path.is_empty() {
            return Err(PackageError::InvalidArgument("empty entry name"));
        }
        self.require(PackageState::Read)?;

        let name = normalize(path);
        let hashes = self.options.hasher.triple(&name);
        let index = self
            .index
            .lookup(&hashes)
            .ok_or(PackageError::NotFound(name))?;
        self.open_entry_by_index(index)
    }

    pub fn open_entry_by_index(&self, index: usize) -> Result<EntryHandle> {
        self.require(PackageState::Read)?;
        let entry = self.table.get(index)?;
        Ok(EntryHandle::new(index, entry.original_size as u64))
    }

    pub fn close_entry(&self, handle: &mut EntryHandle) {
        handle.close();
    }

    /// Read up to `buf.len()` bytes at the handle's position.
    pub fn read_entry(&self, handle: &mut EntryHandle, buf: &mut [u8]) -> Result<usize> {
        let len = buf.len();
        self.read_elements(handle, buf, 1, len)
    }

    /// Read up to `element_count` whole elements of `element_size` bytes.
    ///
    /// The count is clamped to what remains of the entry, so reading past the
    /// end is not an error. Returns the number of whole elements read; the
    /// handle advances by that many elements.
    pub fn read_elements(
        &self,
        handle:        &mut EntryHandle,
        buf:           &mut [u8],
        element_size:  usize,
        element_count: usize,
    ) -> Result<usize> {
        if element_size == 0 {
            return Err(PackageError::InvalidArgument("element size is zero"));
        }
        let requested = element_size
            .checked_mul(element_count)
            .filter(|&n| n <= buf.len())
            .ok_or(PackageError::InvalidArgument("buffer smaller than requested elements"))?;
        let index = handle.entry.ok_or(PackageError::InvalidHandle)?;
        self.require(PackageState::Read)?;
        let entry = self.table.get(index)?;

        let available = (handle.remaining() / element_size as u64).min(element_count as u64);
        let wanted = (available as usize * element_size).min(requested);
        if wanted == 0 {
            return Ok(0);
        }

        let start = entry.offset as u64 + handle.position;
        let read = {
            let mut storage = self.storage.as_ref().ok_or(PackageError::NotOpen)?.lock();
            storage.seek(SeekFrom::Start(start))?;
            read_full(&mut *storage, &mut buf[..wanted])?
        };

        let elements = read / element_size;
        handle.advance((elements * element_size) as u64);
        Ok(elements)
    }

    pub fn seek_entry(&self, handle: &mut EntryHandle, offset: i64, origin: SeekOrigin) -> u64 {
        handle.seek(offset, origin)
    }

    pub fn tell_entry(&self, handle: &EntryHandle) -> u64 {
        handle.tell()
    }

    /// `Read + Seek` adapter over the entry at `path`.
    pub fn reader(&self, path: &str) -> Result<EntryReader<'_, S>> {
        Ok(EntryReader::new(self, self.open_entry(path)?))
    }

    /// Entire contents of the entry at `path`.
    pub fn read_all(&self, path: &str) -> Result<Vec<u8>> {
        let handle = self.open_entry(path)?;
        self.read_handle_to_end(handle)
    }

    fn read_handle_to_end(&self, mut handle: EntryHandle) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.try_reserve_exact(handle.size() as usize)?;
        out.resize(handle.size() as usize, 0);
        let n = self.read_entry(&mut handle, &mut out)?;
        out.truncate(n);
        Ok(out)
    }

    // ── Listing ──────────────────────────────────────────────────────────────

    /// Index of the entry named `path`, in either open mode.
    pub fn find(&self, path: &str) -> Option<usize> {
        let hashes = self.options.hasher.triple(&normalize(path));
        match self.state {
            PackageState::Read    => self.index.lookup(&hashes),
            PackageState::Write   => self.table.position(&hashes),
            PackageState::Closed  => None,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// Every entry in index order. Empty when closed.
    pub fn list(&self) -> Vec<EntryInfo> {
        self.table
            .iter()
            .enumerate()
            .map(|(i, e)| EntryInfo::new(i, e))
            .collect()
    }

    /// Write every entry under `dest`, creating directories as needed.
    /// Returns the number of files written.
    pub fn extract_all<P: AsRef<Path>>(&self, dest: P) -> Result<usize> {
        self.require(PackageState::Read)?;
        let dest = dest.as_ref();
        fs::create_dir_all(dest)?;

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            (0..self.table.len())
                .into_par_iter()
                .map(|i| self.extract_one(i, dest))
                .collect::<Result<Vec<()>>>()?;
        }
        #[cfg(not(feature = "parallel"))]
        for i in 0..self.table.len() {
            self.extract_one(i, dest)?;
        }
        Ok(self.table.len())
    }

    fn extract_one(&self, index: usize, dest: &Path) -> Result<()> {
        let entry = self.table.get(index)?;
        let target = dest.join(safe_relative(&entry.name)?);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut reader = EntryReader::new(self, self.open_entry_by_index(index)?);
        let mut out = BufWriter::new(File::create(&target)?);
        io::copy(&mut reader, &mut out)?;
        out.flush()?;
        debug!(name = %entry.name, target = %target.display(), "entry extracted");
        Ok(())
    }
}

impl<S: Storage> Drop for PackageFile<S> {
    fn drop(&mut self) {
        self.close();
    }
}

// ── Parsing ──────────────────────────────────────────────────────────────────

fn parse<S: Storage>(storage: &mut S, len: u64) -> Result<(PackageHeader, EntryTable)> {
    storage.seek(SeekFrom::Start(0))?;
    let header = PackageHeader::read(&mut *storage)?;
    header.validate()?;

    let count = usize::try_from(header.entry_count)
        .map_err(|_| PackageError::NotAPackage("entry count exceeds address space".into()))?;
    let table_end = count
        .checked_mul(ENTRY_SIZE)
        .and_then(|n| (header.table_offset as u64).checked_add(n as u64))
        .ok_or_else(|| PackageError::NotAPackage("entry table size overflows".into()))?;
    if table_end > len {
        return Err(PackageError::NotAPackage(format!(
            "entry table ends at {table_end}, file is {len} bytes"
        )));
    }

    storage.seek(SeekFrom::Start(header.table_offset as u64))?;
    let mut table = EntryTable::new();
    table.read_from(BufReader::new(&mut *storage), count)?;
    for entry in table.iter() {
        entry.validate(header.table_offset)?;
    }
    Ok((header, table))
}

fn reject(err: PackageError) -> PackageError {
    if err.is_corrupt() {
        warn!(error = %err, "rejected package");
    }
    err
}

/// Keep only the plain components of an entry name.
fn safe_relative(name: &str) -> Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PackageError::InvalidArgument("entry name escapes the destination"))
            }
        }
    }
    if out.as_os_str().is_empty() {
        return Err(PackageError::InvalidArgument("entry name has no file component"));
    }
    Ok(out)
}

/// Read until `buf` is full or the stream ends.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    type MemPackage = PackageFile<Cursor<Vec<u8>>>;

    fn writable() -> MemPackage {
        let mut pkg = MemPackage::with_options(PackOptions::default());
        pkg.open_storage(Cursor::new(Vec::new()), OpenMode::Write).unwrap();
        pkg
    }

    fn reopen(pkg: MemPackage, mode: OpenMode) -> MemPackage {
        let storage = pkg.into_storage().unwrap();
        let mut pkg = MemPackage::with_options(PackOptions::default());
        pkg.open_storage(storage, mode).unwrap();
        pkg
    }

    #[test]
    fn new_package_writes_header() {
        let pkg = writable();
        let bytes = pkg.into_storage().unwrap().into_inner();
        assert_eq!(bytes.len(), crate::header::HEADER_SIZE);
        assert_eq!(&bytes[..4], b"SPAK");
    }

    #[test]
    fn insert_slides_table_offset() {
        let mut pkg = writable();
        assert_eq!(pkg.insert_bytes("a", &[1; 10]).unwrap(), 0);
        assert_eq!(pkg.insert_bytes("b", &[2; 5]).unwrap(), 1);
        let h = pkg.header().unwrap();
        assert_eq!(h.entry_count, 2);
        assert_eq!(h.table_offset, 24 + 15);
        let list = pkg.list();
        assert_eq!(list[0].offset, 24);
        assert_eq!(list[1].offset, 34);
    }

    #[test]
    fn unflushed_inserts_are_lost_on_reopen() {
        let mut pkg = writable();
        pkg.insert_bytes("a", b"data").unwrap();
        let pkg = reopen(pkg, OpenMode::Read);
        assert!(pkg.is_empty());
    }

    #[test]
    fn modes_are_enforced() {
        let mut pkg = writable();
        pkg.insert_bytes("a", b"data").unwrap();
        assert!(matches!(pkg.open_entry("a"), Err(PackageError::ModeMismatch { .. })));
        pkg.flush().unwrap();

        let mut pkg = reopen(pkg, OpenMode::Read);
        assert!(matches!(pkg.insert_bytes("b", b"x"), Err(PackageError::ModeMismatch { .. })));
        assert!(matches!(pkg.flush(), Err(PackageError::ModeMismatch { .. })));
        assert!(matches!(
            pkg.open_storage(Cursor::new(Vec::new()), OpenMode::Read),
            Err(PackageError::AlreadyOpen)
        ));

        pkg.close();
        pkg.close();
        assert_eq!(pkg.state(), PackageState::Closed);
        assert!(matches!(pkg.open_entry("a"), Err(PackageError::NotOpen)));
        assert!(matches!(pkg.flush(), Err(PackageError::NotOpen)));
    }

    #[test]
    fn element_reads_count_whole_elements() {
        let mut pkg = writable();
        pkg.insert_bytes("e", &[7; 10]).unwrap();
        pkg.flush().unwrap();
        let pkg = reopen(pkg, OpenMode::Read);

        let mut h = pkg.open_entry("e").unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(pkg.read_elements(&mut h, &mut buf, 4, 4).unwrap(), 2);
        assert_eq!(h.tell(), 8);
        assert_eq!(pkg.read_elements(&mut h, &mut buf, 4, 1).unwrap(), 0);
        assert_eq!(h.tell(), 8);
        assert_eq!(pkg.read_elements(&mut h, &mut buf, 1, 16).unwrap(), 2);
        assert_eq!(h.tell(), 10);

        assert!(matches!(
            pkg.read_elements(&mut h, &mut buf, 0, 1),
            Err(PackageError::InvalidArgument(_))
        ));
        assert!(matches!(
            pkg.read_elements(&mut h, &mut buf, 4, 5),
            Err(PackageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn closed_handle_cannot_read() {
        let mut pkg = writable();
        pkg.insert_bytes("e", b"abc").unwrap();
        pkg.flush().unwrap();
        let pkg = reopen(pkg, OpenMode::Read);

        let mut h = pkg.open_entry("E").unwrap();
        pkg.close_entry(&mut h);
        let mut buf = [0u8; 3];
        assert!(matches!(pkg.read_entry(&mut h, &mut buf), Err(PackageError::InvalidHandle)));
        assert!(matches!(pkg.open_entry_by_index(5), Err(PackageError::OutOfRange { index: 5, len: 1 })));
    }

    #[test]
    fn reopen_for_write_appends_after_existing() {
        let mut pkg = writable();
        pkg.insert_bytes("first", b"11111").unwrap();
        pkg.flush().unwrap();

        let mut pkg = reopen(pkg, OpenMode::Write);
        assert_eq!(pkg.len(), 1);
        assert!(matches!(pkg.insert_bytes("FIRST", b"x"), Err(PackageError::AlreadyExists(_))));
        assert_eq!(pkg.insert_bytes("second", b"22").unwrap(), 1);
        pkg.flush().unwrap();

        let pkg = reopen(pkg, OpenMode::Read);
        assert_eq!(pkg.read_all("first").unwrap(), b"11111");
        assert_eq!(pkg.read_all("second").unwrap(), b"22");
    }

    #[test]
    fn reopened_empty_package_can_grow() {
        let mut pkg = writable();
        pkg.flush().unwrap();
        let mut pkg = reopen(pkg, OpenMode::Write);
        assert!(pkg.is_empty());
        assert_eq!(pkg.insert_bytes("late", b"ok").unwrap(), 0);
    }

    #[test]
    fn empty_payloads_are_rejected() {
        let mut pkg = writable();
        assert!(matches!(pkg.insert_bytes("empty", b""), Err(PackageError::InvalidArgument(_))));
        assert!(matches!(pkg.insert_bytes("", b"x"), Err(PackageError::InvalidArgument(_))));
        assert!(pkg.is_empty());
    }

    #[test]
    fn safe_relative_strips_roots_and_rejects_parents() {
        assert_eq!(safe_relative("/a/b.txt").unwrap(), PathBuf::from("a/b.txt"));
        assert_eq!(safe_relative("./a").unwrap(), PathBuf::from("a"));
        assert!(safe_relative("../etc/passwd").is_err());
        assert!(safe_relative("/").is_err());
    }
}
