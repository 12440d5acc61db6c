//! Book directory layout.
//!
//! ```text
//! <root>/<book_id>/
//! ├─ _global_index.jsonl        # every record in the book
//! └─ <unit-path>/
//!    ├─ events.jsonl            # events stream data
//!    ├─ events.index.jsonl      # events stream unit index
//!    ├─ summary.jsonl           # summary stream data
//!    └─ summary.index.jsonl     # summary stream unit index
//! ```
//!
//! Unit directories are created on the first write below them. Every path
//! handed out for a unit is checked to resolve inside the book directory,
//! so a symlink planted in the tree cannot redirect writes elsewhere.

use crate::address::{validate_segment, Stream, UnitAddress};
use crate::error::{CoreError, CoreResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the book-wide index.
pub const GLOBAL_INDEX_FILE: &str = "_global_index.jsonl";

/// Resolved locations inside one book.
#[derive(Debug, Clone)]
pub struct BookDir {
    /// Canonical path of `<root>/<book_id>`.
    base: PathBuf,
    /// The book identifier.
    book_id: String,
}

impl BookDir {
    /// Opens the book directory, creating it if allowed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `book_id` is not a single valid segment (`InvalidAddress`)
    /// - the directory is missing and `create_if_missing` is false (`NotFound`)
    /// - the path exists but is not a directory, or I/O fails
    pub fn open(root: &Path, book_id: &str, create_if_missing: bool) -> CoreResult<Self> {
        let book_id = validate_segment(book_id.trim())?;
        let base = root.join(book_id);

        if !base.exists() {
            if create_if_missing {
                fs::create_dir_all(&base)?;
            } else {
                return Err(CoreError::not_found(format!(
                    "book directory {}",
                    base.display()
                )));
            }
        }

        if !base.is_dir() {
            return Err(CoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("book path is not a directory: {}", base.display()),
            )));
        }

        Ok(Self {
            base: base.canonicalize()?,
            book_id: book_id.to_string(),
        })
    }

    /// Canonical path of the book directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base
    }

    /// The book identifier.
    #[must_use]
    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    /// Path of the book-wide index.
    #[must_use]
    pub fn global_index_path(&self) -> PathBuf {
        self.base.join(GLOBAL_INDEX_FILE)
    }

    /// Directory of a unit, verified to lie inside the book.
    ///
    /// Does not create anything.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if the location escapes the book directory.
    pub fn unit_dir(&self, unit: &UnitAddress) -> CoreResult<PathBuf> {
        let dir = self.base.join(unit.to_relative_path());
        self.verify_within(unit, &dir)?;
        Ok(dir)
    }

    /// Like [`unit_dir`](Self::unit_dir) but creates the directory first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if the created location escapes the book
    /// directory, or an I/O error.
    pub fn ensure_unit_dir(&self, unit: &UnitAddress) -> CoreResult<PathBuf> {
        let dir = self.unit_dir(unit)?;
        fs::create_dir_all(&dir)?;
        self.verify_within(unit, &dir)?;
        Ok(dir)
    }

    /// Path of a stream's data log.
    ///
    /// # Errors
    ///
    /// See [`unit_dir`](Self::unit_dir).
    pub fn data_path(&self, unit: &UnitAddress, stream: Stream) -> CoreResult<PathBuf> {
        Ok(self.unit_dir(unit)?.join(stream.data_file_name()))
    }

    /// Path of a stream's unit index.
    ///
    /// # Errors
    ///
    /// See [`unit_dir`](Self::unit_dir).
    pub fn index_path(&self, unit: &UnitAddress, stream: Stream) -> CoreResult<PathBuf> {
        Ok(self.unit_dir(unit)?.join(stream.index_file_name()))
    }

    /// Lists every `(unit, stream)` that has a data log, sorted.
    ///
    /// Symlinked directories are not followed and directories whose
    /// relative path is not a valid unit address are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be read.
    pub fn units(&self) -> CoreResult<Vec<(UnitAddress, Stream)>> {
        let mut found = Vec::new();
        let mut pending = vec![self.base.clone()];

        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    pending.push(entry.path());
                }
            }

            if dir == self.base {
                continue;
            }

            let Some(unit) = self.unit_for_dir(&dir) else {
                tracing::debug!(dir = %dir.display(), "skipping directory that is not a unit address");
                continue;
            };
            for stream in Stream::ALL {
                if dir.join(stream.data_file_name()).is_file() {
                    found.push((unit.clone(), stream));
                }
            }
        }

        found.sort();
        Ok(found)
    }

    fn unit_for_dir(&self, dir: &Path) -> Option<UnitAddress> {
        let relative = dir.strip_prefix(&self.base).ok()?;
        let segments: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        UnitAddress::parse(&segments.join("/")).ok()
    }

    /// Checks that the deepest existing ancestor of `path` canonicalizes to
    /// a location inside the book. The non-existing remainder consists of
    /// validated segments only.
    fn verify_within(&self, unit: &UnitAddress, path: &Path) -> CoreResult<()> {
        let mut probe = path;
        let resolved = loop {
            match probe.canonicalize() {
                Ok(resolved) => break resolved,
                Err(e) if e.kind() == io::ErrorKind::NotFound => match probe.parent() {
                    Some(parent) => probe = parent,
                    None => return Err(e.into()),
                },
                Err(e) => return Err(e.into()),
            }
        };

        if resolved.starts_with(&self.base) {
            Ok(())
        } else {
            tracing::warn!(
                address = %unit,
                resolved = %resolved.display(),
                "unit path resolves outside the book directory"
            );
            Err(CoreError::invalid_address(
                unit.as_str(),
                "resolves outside the book directory",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use tempfile::tempdir;

    #[test]
    fn open_creates_book_dir() {
        let root = tempdir().unwrap();
        let book = BookDir::open(root.path(), "book1", true).unwrap();
        assert!(root.path().join("book1").is_dir());
        assert_eq!(book.book_id(), "book1");
        assert!(book.global_index_path().ends_with(GLOBAL_INDEX_FILE));
    }

    #[test]
    fn open_missing_without_create() {
        let root = tempdir().unwrap();
        let err = BookDir::open(root.path(), "nope", false).unwrap_err();
        assert_eq!(err.status(), Status::NotFound);
        assert!(!root.path().join("nope").exists());
    }

    #[test]
    fn open_rejects_bad_book_id() {
        let root = tempdir().unwrap();
        for bad in ["", "..", "a/b", "a b"] {
            let err = BookDir::open(root.path(), bad, true).unwrap_err();
            assert_eq!(err.status(), Status::InvalidAddress, "{bad:?}");
        }
    }

    #[test]
    fn unit_paths_do_not_create() {
        let root = tempdir().unwrap();
        let book = BookDir::open(root.path(), "b", true).unwrap();
        let unit = UnitAddress::parse("a/b/c").unwrap();

        let data = book.data_path(&unit, Stream::Events).unwrap();
        assert!(data.ends_with("a/b/c/events.jsonl"));
        assert!(!book.path().join("a").exists());

        let dir = book.ensure_unit_dir(&unit).unwrap();
        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_is_rejected() {
        let root = tempdir().unwrap();
        let outside = tempdir().unwrap();
        let book = BookDir::open(root.path(), "b", true).unwrap();
        std::os::unix::fs::symlink(outside.path(), book.path().join("evil")).unwrap();

        let unit = UnitAddress::parse("evil/x").unwrap();
        let err = book.ensure_unit_dir(&unit).unwrap_err();
        assert_eq!(err.status(), Status::InvalidAddress);
        assert!(!outside.path().join("x").exists());
    }

    #[test]
    fn units_lists_streams_with_data() {
        let root = tempdir().unwrap();
        let book = BookDir::open(root.path(), "b", true).unwrap();

        for (addr, stream) in [("a", Stream::Events), ("a/b", Stream::Summary), ("c", Stream::Events)] {
            let unit = UnitAddress::parse(addr).unwrap();
            let dir = book.ensure_unit_dir(&unit).unwrap();
            fs::write(dir.join(stream.data_file_name()), b"").unwrap();
        }
        fs::create_dir_all(book.path().join("not a unit")).unwrap();
        fs::write(book.path().join("not a unit").join("events.jsonl"), b"").unwrap();

        let units: Vec<(String, Stream)> = book
            .units()
            .unwrap()
            .into_iter()
            .map(|(u, s)| (u.to_string(), s))
            .collect();
        assert_eq!(
            units,
            vec![
                ("a".to_string(), Stream::Events),
                ("a/b".to_string(), Stream::Summary),
                ("c".to_string(), Stream::Events),
            ]
        );
    }
}
