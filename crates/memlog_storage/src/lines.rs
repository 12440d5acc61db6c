//! Newline-delimited scanning with byte offsets.

use crate::error::{StorageError, StorageResult};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// One physical line read from a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Offset of the first byte of the line within the file.
    pub offset: u64,
    /// Raw bytes of the line, including the trailing `\n` when present.
    pub bytes: Vec<u8>,
}

impl Line {
    /// Number of bytes the line occupies in the file.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Returns true if the line has no bytes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns true if the line holds nothing but whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(u8::is_ascii_whitespace)
    }

    /// Returns true if the line was terminated by `\n`.
    ///
    /// Only the last line of a file that was cut off mid-append lacks one.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.bytes.last() == Some(&b'\n')
    }

    /// The line content without the trailing `\n` or `\r\n`.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        let mut end = self.bytes.len();
        if end > 0 && self.bytes[end - 1] == b'\n' {
            end -= 1;
        }
        if end > 0 && self.bytes[end - 1] == b'\r' {
            end -= 1;
        }
        &self.bytes[..end]
    }
}

/// Sequential reader over the lines of a log file.
///
/// Yields every physical line, blank ones included, so callers can keep
/// byte offsets exact. Offsets are counted from where the scanner started.
pub struct LineScanner<R> {
    reader: R,
    offset: u64,
    done: bool,
}

impl<R: BufRead> LineScanner<R> {
    /// Creates a scanner over any buffered reader positioned at offset 0.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            done: false,
        }
    }
}

impl LineScanner<BufReader<File>> {
    /// Opens an existing file for scanning.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Missing`] if the file does not exist.
    pub fn open(path: &Path) -> StorageResult<Self> {
        match File::open(path) {
            Ok(file) => Ok(Self::new(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::Missing {
                path: path.to_path_buf(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

impl<R: BufRead> Iterator for LineScanner<R> {
    type Item = StorageResult<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut bytes = Vec::new();
        match self.reader.read_until(b'\n', &mut bytes) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                let line = Line {
                    offset: self.offset,
                    bytes,
                };
                self.offset += n as u64;
                Some(Ok(line))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn scan(data: &[u8]) -> Vec<Line> {
        LineScanner::new(Cursor::new(data.to_vec()))
            .collect::<StorageResult<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(scan(b"").is_empty());
    }

    #[test]
    fn offsets_track_every_line() {
        let lines = scan(b"{\"a\":1}\n\n{\"b\":2}\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].offset, 0);
        assert_eq!(lines[0].len(), 8);
        assert!(lines[1].is_blank());
        assert_eq!(lines[1].offset, 8);
        assert_eq!(lines[2].offset, 9);
        assert_eq!(lines[2].payload(), b"{\"b\":2}");
    }

    #[test]
    fn trailing_partial_line_is_reported_unterminated() {
        let lines = scan(b"one\ntw");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_terminated());
        assert!(!lines[1].is_terminated());
        assert_eq!(lines[1].payload(), b"tw");
    }

    #[test]
    fn crlf_is_stripped_from_payload() {
        let lines = scan(b"abc\r\n");
        assert_eq!(lines[0].payload(), b"abc");
        assert_eq!(lines[0].len(), 5);
    }

    #[test]
    fn open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = LineScanner::open(&dir.path().join("nope.jsonl"));
        assert!(matches!(result, Err(StorageError::Missing { .. })));
    }

    proptest! {
        #[test]
        fn offsets_are_contiguous(chunks in proptest::collection::vec("[a-z{}\":,]{0,12}", 0..20)) {
            let data: String = chunks.iter().map(|c| format!("{c}\n")).collect();
            let lines = scan(data.as_bytes());
            let mut expected = 0u64;
            for line in &lines {
                prop_assert_eq!(line.offset, expected);
                expected += line.len();
            }
            prop_assert_eq!(expected, data.len() as u64);
        }
    }
}
