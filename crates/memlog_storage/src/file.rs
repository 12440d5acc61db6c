//! File-based append-only storage for JSON-lines logs.

use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Byte range occupied by one appended line, delimiter included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineSpan {
    /// Offset of the first byte of the line.
    pub offset: u64,
    /// Number of bytes written, including the trailing `\n`.
    pub len: u64,
}

impl LineSpan {
    /// Returns the offset one past the last byte of the line.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.len)
    }
}

/// A file-based storage backend for one append-only log file.
///
/// Writable handles are opened in append mode, so every append lands at the
/// current end of file even when other handles (or other threads holding
/// their own handle) append to the same file. The offset reported for an
/// append is derived from the handle's position after the write, which the
/// OS sets to the end of the bytes just written.
///
/// # Durability
///
/// Appends are unbuffered writes; `sync()` calls `File::sync_data()` to
/// ensure they are on disk.
///
/// # Thread Safety
///
/// Reads take the handle lock because they seek; a single handle can be
/// shared across threads.
///
/// # Example
///
/// ```no_run
/// use memlog_storage::FileBackend;
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("events.jsonl")).unwrap();
/// let span = backend.append_line(br#"{"id":"a"}"#).unwrap();
/// backend.sync().unwrap();
/// let bytes = backend.read_at(span.offset, span.len).unwrap();
/// assert_eq!(bytes.last(), Some(&b'\n'));
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: RwLock<File>,
    writable: bool,
}

impl FileBackend {
    /// Opens or creates a log file for reading and appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            writable: true,
        })
    }

    /// Opens an existing log file for reading only.
    ///
    /// Never creates anything on disk.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Missing`] if the file does not exist.
    pub fn open_existing(path: &Path) -> StorageResult<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::Missing {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
            writable: false,
        })
    }

    /// Reads exactly `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadPastEnd`] if the range extends beyond the
    /// end of the file, or an I/O error.
    pub fn read_at(&self, offset: u64, len: u64) -> StorageResult<Vec<u8>> {
        let mut file = self.file.write();
        let size = file.metadata()?.len();
        let end = offset.saturating_add(len);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(Vec::new());
        }

        let len = usize::try_from(len).map_err(|_| StorageError::ReadPastEnd {
            offset,
            len,
            size,
        })?;

        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    /// Appends raw bytes to the end of the file.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is read-only or an I/O error occurs.
    pub fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if !self.writable {
            return Err(StorageError::ReadOnly {
                path: self.path.clone(),
            });
        }

        let mut file = self.file.write();
        if data.is_empty() {
            return Ok(file.metadata()?.len());
        }

        file.write_all(data)?;
        let end = file.stream_position()?;

        Ok(end.saturating_sub(data.len() as u64))
    }

    /// Appends `payload` followed by a single `\n` as one write.
    ///
    /// The payload must not itself contain a newline; JSON produced by
    /// `serde_json` never does.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is read-only or an I/O error occurs.
    pub fn append_line(&mut self, payload: &[u8]) -> StorageResult<LineSpan> {
        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload);
        line.push(b'\n');

        let offset = self.append(&line)?;
        Ok(LineSpan {
            offset,
            len: line.len() as u64,
        })
    }

    /// Syncs appended data to durable storage.
    ///
    /// Uses `sync_data`: the file length is part of the data, other
    /// metadata such as timestamps is not forced out.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    pub fn sync(&mut self) -> StorageResult<()> {
        self.file.write().sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let backend = FileBackend::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        drop(backend);
    }

    #[test]
    fn file_append_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut backend = FileBackend::open(&path).unwrap();

        let offset1 = backend.append(b"hello").unwrap();
        assert_eq!(offset1, 0);

        let offset2 = backend.append(b" world").unwrap();
        assert_eq!(offset2, 5);

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 11);
        assert_eq!(&backend.read_at(0, 11).unwrap(), b"hello world");
    }

    #[test]
    fn append_line_reports_span_with_delimiter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut backend = FileBackend::open(&path).unwrap();
        let first = backend.append_line(b"{\"a\":1}").unwrap();
        let second = backend.append_line(b"{\"b\":22}").unwrap();

        assert_eq!(first, LineSpan { offset: 0, len: 8 });
        assert_eq!(second.offset, first.end());
        assert_eq!(second.len, 9);
        assert_eq!(&backend.read_at(second.offset, second.len).unwrap(), b"{\"b\":22}\n");
    }

    #[test]
    fn two_handles_append_to_same_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut a = FileBackend::open(&path).unwrap();
        let mut b = FileBackend::open(&path).unwrap();

        let s1 = a.append_line(b"one").unwrap();
        let s2 = b.append_line(b"two").unwrap();
        let s3 = a.append_line(b"three").unwrap();

        assert_eq!(s1.offset, 0);
        assert_eq!(s2.offset, 4);
        assert_eq!(s3.offset, 8);
        assert_eq!(&a.read_at(s2.offset, s2.len).unwrap(), b"two\n");
    }

    #[test]
    fn file_read_past_end_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"hello").unwrap();

        let result = backend.read_at(3, 5);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn open_existing_does_not_create() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.jsonl");

        let err = FileBackend::open_existing(&path).unwrap_err();
        assert!(err.is_missing());
        assert!(!path.exists());
    }

    #[test]
    fn read_only_handle_rejects_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        FileBackend::open(&path).unwrap().append_line(b"x").unwrap();

        let mut backend = FileBackend::open_existing(&path).unwrap();
        assert!(matches!(
            backend.append_line(b"y"),
            Err(StorageError::ReadOnly { .. })
        ));
        assert_eq!(&backend.read_at(0, 2).unwrap(), b"x\n");
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append_line(b"persistent data").unwrap();
            backend.sync().unwrap();
        }

        {
            let backend = FileBackend::open_existing(&path).unwrap();
            assert_eq!(std::fs::metadata(&path).unwrap().len(), 16);
            assert_eq!(&backend.read_at(0, 15).unwrap(), b"persistent data");
        }
    }
}
