//! Whole-file replacement via temp file and rename.

use crate::error::StorageResult;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A replacement for `target` that becomes visible only on [`commit`].
///
/// Lines are written to `<target>.tmp` in the same directory. Committing
/// syncs the temp file, renames it over the target and syncs the directory,
/// so readers observe either the old file or the complete new one. Dropping
/// an uncommitted `AtomicFile` removes the temp file and leaves the target
/// untouched.
///
/// [`commit`]: AtomicFile::commit
#[derive(Debug)]
pub struct AtomicFile {
    target: PathBuf,
    temp: PathBuf,
    writer: Option<BufWriter<File>>,
    lines: u64,
}

impl AtomicFile {
    /// Starts a replacement for `target`, truncating any stale temp file.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be created.
    pub fn create(target: &Path) -> StorageResult<Self> {
        let temp = temp_path(target);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp)?;

        Ok(Self {
            target: target.to_path_buf(),
            temp,
            writer: Some(BufWriter::new(file)),
            lines: 0,
        })
    }

    /// Path of the temporary file backing this replacement.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.temp
    }

    /// Writes `payload` followed by `\n`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write_line(&mut self, payload: &[u8]) -> StorageResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(payload)?;
            writer.write_all(b"\n")?;
            self.lines += 1;
        }
        Ok(())
    }

    /// Makes the new contents visible at the target path.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing, syncing or renaming fails. The target
    /// is unchanged in that case and the temp file is removed.
    pub fn commit(mut self) -> StorageResult<()> {
        if let Some(writer) = self.writer.take() {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        fs::rename(&self.temp, &self.target)?;
        if let Some(parent) = self.target.parent() {
            sync_dir(parent)?;
        }
        Ok(())
    }
}

impl Drop for AtomicFile {
    fn drop(&mut self) {
        // Only reached with the temp file still present when commit was
        // skipped or failed before the rename.
        self.writer.take();
        if self.temp.exists() {
            if let Err(e) = fs::remove_file(&self.temp) {
                tracing::warn!(path = %self.temp.display(), error = %e, "failed to remove temp file");
            }
        }
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Syncs a directory so that renames inside it are durable.
#[cfg(unix)]
pub fn sync_dir(dir: &Path) -> StorageResult<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

/// Directory fsync is not available on this platform; the filesystem
/// journal covers rename durability.
#[cfg(not(unix))]
pub fn sync_dir(_dir: &Path) -> StorageResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn commit_replaces_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("events.index.jsonl");
        fs::write(&target, b"old\n").unwrap();

        let mut file = AtomicFile::create(&target).unwrap();
        file.write_line(b"new-1").unwrap();
        file.write_line(b"new-2").unwrap();
        let temp = file.temp_path().to_path_buf();
        file.commit().unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new-1\nnew-2\n");
        assert!(!temp.exists());
    }

    #[test]
    fn drop_without_commit_keeps_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("_global_index.jsonl");
        fs::write(&target, b"original\n").unwrap();

        let temp;
        {
            let mut file = AtomicFile::create(&target).unwrap();
            file.write_line(b"partial").unwrap();
            temp = file.temp_path().to_path_buf();
            assert!(temp.exists());
        }

        assert!(!temp.exists());
        assert_eq!(fs::read(&target).unwrap(), b"original\n");
    }

    #[test]
    fn commit_creates_missing_target() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("summary.index.jsonl");

        let file = AtomicFile::create(&target).unwrap();
        file.commit().unwrap();

        assert!(target.exists());
        assert!(fs::read(&target).unwrap().is_empty());
    }

    #[test]
    fn temp_name_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/x/events.index.jsonl")),
            PathBuf::from("/x/events.index.jsonl.tmp")
        );
    }
}
