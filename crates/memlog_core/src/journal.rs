//! JSON-lines log writer and reader.
//!
//! Data files and both index kinds share one write discipline: one compact
//! JSON object per line, appended through an append-mode handle. This
//! module is the only place that turns values into lines and back.

use crate::error::{CoreError, CoreResult};
use memlog_storage::{FileBackend, LineScanner, LineSpan, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::marker::PhantomData;
use std::path::Path;

/// Appends `value` as one line to the file at `path`, creating the file if
/// needed, and returns the span the line occupies.
///
/// # Errors
///
/// Returns an error if encoding or any file operation fails.
pub fn append_json_line<T: Serialize>(path: &Path, value: &T, sync: bool) -> CoreResult<LineSpan> {
    let payload = serde_json::to_vec(value)?;
    let mut backend = FileBackend::open(path)?;
    let span = backend.append_line(&payload)?;
    if sync {
        backend.sync()?;
    }
    Ok(span)
}

/// Reads and decodes the line stored at `span`.
///
/// # Errors
///
/// Returns [`CoreError::Decode`] if the range lies past the end of the file
/// or its bytes are not a `T`, or an I/O error.
pub fn read_json_at<T: DeserializeOwned>(backend: &FileBackend, span: LineSpan) -> CoreResult<T> {
    let bytes = match backend.read_at(span.offset, span.len) {
        Ok(bytes) => bytes,
        Err(e @ StorageError::ReadPastEnd { .. }) => {
            return Err(CoreError::decode(span.offset, e.to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes).map_err(|e| CoreError::decode(span.offset, e.to_string()))
}

/// Iterator over the decodable lines of a JSON-lines file.
///
/// Blank lines are ignored. Lines that do not decode as `T` are logged and
/// skipped. An I/O error ends the iteration after being yielded once.
pub struct JsonLines<T> {
    scanner: LineScanner<BufReader<File>>,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> JsonLines<T> {
    /// Opens `path` for scanning.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if the file does not exist.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let scanner = LineScanner::open(path).map_err(|e| {
            if e.is_missing() {
                CoreError::not_found(path.display().to_string())
            } else {
                e.into()
            }
        })?;
        Ok(Self {
            scanner,
            path: path.display().to_string(),
            _marker: PhantomData,
        })
    }
}

impl<T: DeserializeOwned> Iterator for JsonLines<T> {
    type Item = CoreResult<(LineSpan, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.scanner.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.is_blank() {
                continue;
            }

            let span = LineSpan {
                offset: line.offset,
                len: line.len(),
            };
            match serde_json::from_slice(line.payload()) {
                Ok(value) => return Some(Ok((span, value))),
                Err(e) if !line.is_terminated() => {
                    tracing::warn!(
                        path = %self.path,
                        offset = span.offset,
                        len = span.len,
                        error = %e,
                        "skipping torn trailing line"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path,
                        offset = span.offset,
                        error = %e,
                        "skipping malformed line"
                    );
                }
            }
        }
    }
}

/// Reads every decodable line of the file at `path`, in file order.
///
/// # Errors
///
/// Returns [`CoreError::NotFound`] if the file does not exist, or an I/O
/// error.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> CoreResult<Vec<T>> {
    JsonLines::open(path)?
        .map(|item| item.map(|(_, value)| value))
        .collect()
}
