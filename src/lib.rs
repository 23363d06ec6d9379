//! Single-file package container.
//!
//! Many files are packed into one container, each addressed by its
//! normalized path and located through a hash index built from three
//! independent 32-bit hashes.
//!
//! ```no_run
//! use pakfile::{OpenMode, PackageFile};
//!
//! // Write
//! let mut pkg = PackageFile::new();
//! pkg.open("game.pak", OpenMode::Write)?;
//! pkg.insert_bytes("Textures\\Grass.dds", b"DDS ...")?;
//! pkg.flush()?;
//! pkg.close();
//!
//! // Read
//! pkg.open("game.pak", OpenMode::Read)?;
//! let mut handle = pkg.open_entry("textures/grass.dds")?;
//! let mut buf = [0u8; 4];
//! let n = pkg.read_entry(&mut handle, &mut buf)?;
//! assert_eq!(&buf[..n], b"DDS ");
//! # Ok::<(), pakfile::PackageError>(())
//! ```

pub mod entry;
pub mod error;
pub mod handle;
pub mod hash;
pub mod hash_index;
pub mod header;
pub mod package;
pub mod path;
pub mod storage;
pub mod table;

pub use entry::{FileEntry, ENTRY_SIZE};
pub use error::{PackageError, Result};
pub use handle::{EntryHandle, EntryReader, SeekOrigin};
pub use hash::{HashOracle, HashTriple, StandardHashes};
pub use hash_index::{HashIndex, HashSlot};
pub use header::{PackageHeader, FORMAT_VERSION, HEADER_SIZE, MAGIC};
pub use package::{EntryInfo, OpenMode, PackOptions, PackageFile, PackageState};
pub use path::{normalize, MAX_NAME_LEN, NAME_CAPACITY};
pub use storage::Storage;
pub use table::{EntryTable, INITIAL_TABLE_CAPACITY};
