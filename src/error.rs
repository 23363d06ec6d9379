use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::package::PackageState;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Package is already open; close it first")]
    AlreadyOpen,

    #[error("Package is not open")]
    NotOpen,

    #[error("Operation requires {expected:?} mode, package is {actual:?}")]
    ModeMismatch { expected: PackageState, actual: PackageState },

    #[error("Failed to open {}: {source}", path.display())]
    OpenFailed { path: PathBuf, source: io::Error },

    #[error("Failed to create {}: {source}", path.display())]
    CreateFailed { path: PathBuf, source: io::Error },

    #[error("Not a package file: {0}")]
    NotAPackage(String),

    #[error("Entry index {index} out of range (table holds {len} entries)")]
    OutOfRange { index: usize, len: usize },

    #[error("Entry handle is closed")]
    InvalidHandle,

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Entry name is {len} bytes, maximum is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),

    #[error("Hash index could not place entry {entry} of {count}")]
    IndexBuildFailed { entry: usize, count: usize },
}

impl PackageError {
    /// The path is simply absent from the package.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PackageError::NotFound(_))
    }

    /// The package itself is malformed or its index is unusable.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, PackageError::NotAPackage(_) | PackageError::IndexBuildFailed { .. })
    }

    /// The underlying storage or a source file failed.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            PackageError::Io(_) | PackageError::OpenFailed { .. } | PackageError::CreateFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;

/// Maps a short read during parsing to `NotAPackage`; other I/O errors pass through.
pub(crate) fn truncated(what: &'static str) -> impl FnOnce(io::Error) -> PackageError {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            PackageError::NotAPackage(format!("truncated {what}"))
        } else {
            PackageError::Io(e)
        }
    }
}
