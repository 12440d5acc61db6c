//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of a file.
    #[error("read beyond end of file: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: u64,
        /// The current file size.
        size: u64,
    },

    /// The file does not exist and was opened without create.
    #[error("file not found: {}", path.display())]
    Missing {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The handle was opened read-only and cannot be appended to.
    #[error("file opened read-only: {}", path.display())]
    ReadOnly {
        /// The path of the read-only file.
        path: PathBuf,
    },
}

impl StorageError {
    /// Returns true if the error means the file simply does not exist.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
