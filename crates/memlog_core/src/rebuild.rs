//! Index recovery.
//!
//! Indexes are pure derivations of the data files. Rebuilding one scans
//! the data file line by line, emits an entry for every line that decodes
//! as a record with a string id, and atomically replaces the index file.
//! Rebuilds are only ever run on request.

use crate::address::{Stream, UnitAddress};
use crate::config::{Config, MissingTimePolicy};
use crate::error::{CoreError, CoreResult};
use crate::index::{GlobalIndexEntry, UnitIndexEntry};
use crate::journal::JsonLines;
use crate::layout::BookDir;
use crate::record::lenient_epoch;
use memlog_storage::AtomicFile;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The two record fields an index needs.
#[derive(Debug, Deserialize)]
struct IndexedFields {
    id: String,
    #[serde(default, deserialize_with = "lenient_epoch")]
    t: Option<i64>,
}

/// Consistency of one stream's unit index with its data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IndexState {
    /// The stream has never been written.
    Absent,
    /// The index lists exactly the records in the data file.
    Consistent,
    /// The index is missing entries, has extra ones, or points at the
    /// wrong bytes.
    Stale {
        /// Entries in the index file.
        indexed: usize,
        /// Entries a rebuild would write.
        derived: usize,
    },
}

impl IndexState {
    /// Returns true for [`IndexState::Stale`].
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }
}

/// Derives the unit index entries for the data file at `data_path`.
///
/// # Errors
///
/// Returns `NotFound` if the data file does not exist, or an I/O error.
pub fn derive_unit_entries(data_path: &Path, config: &Config) -> CoreResult<Vec<UnitIndexEntry>> {
    let mut entries = Vec::new();
    let mut untimed = 0usize;

    for item in JsonLines::<IndexedFields>::open(data_path)? {
        let (span, fields) = item?;
        let t = match (fields.t, config.missing_time) {
            (Some(t), _) => Some(t),
            (None, MissingTimePolicy::Unknown) => {
                untimed += 1;
                None
            }
            (None, MissingTimePolicy::Now) => {
                untimed += 1;
                Some(config.clock.epoch_seconds())
            }
        };
        entries.push(UnitIndexEntry::new(fields.id, t, span));
    }

    if untimed > 0 {
        tracing::warn!(
            path = %data_path.display(),
            untimed,
            policy = ?config.missing_time,
            "records without a usable epoch time"
        );
    }
    Ok(entries)
}

/// Rewrites one stream's unit index from its data file.
///
/// Returns the number of entries written.
///
/// # Errors
///
/// Returns `NotFound` if the stream has no data file, or an I/O error. On
/// error the previous index file is left untouched.
pub fn rebuild_unit(
    book: &BookDir,
    unit: &UnitAddress,
    stream: Stream,
    config: &Config,
) -> CoreResult<usize> {
    let data_path = book.data_path(unit, stream)?;
    if !data_path.is_file() {
        return Err(CoreError::not_found(format!("{unit} ({stream})")));
    }

    let entries = derive_unit_entries(&data_path, config)?;
    let mut out = AtomicFile::create(&book.index_path(unit, stream)?)?;
    for entry in &entries {
        out.write_line(&serde_json::to_vec(entry)?)?;
    }
    out.commit()?;

    tracing::info!(address = %unit, %stream, entries = entries.len(), "unit index rebuilt");
    Ok(entries.len())
}

/// Rewrites the global index from every data file in the book.
///
/// Entries are ordered by time so the rebuilt file lists records in the
/// order they were written. Entries with equal times are ordered by unit,
/// stream and offset; entries with an unknown time come last.
///
/// Returns the number of entries written. The caller is responsible for
/// invalidating any id cache built from the old file.
///
/// # Errors
///
/// Returns an error if the book cannot be walked or any file operation
/// fails. On error the previous global index is left untouched.
pub fn rebuild_global(book: &BookDir, config: &Config) -> CoreResult<usize> {
    let units = book.units()?;
    let mut entries = Vec::new();

    for (unit, stream) in &units {
        let data_path = book.data_path(unit, *stream)?;
        entries.extend(
            derive_unit_entries(&data_path, config)?
                .iter()
                .map(|entry| GlobalIndexEntry::for_unit(unit, *stream, entry)),
        );
    }
    entries.sort_by(|a, b| write_order(a).cmp(&write_order(b)));

    let mut out = AtomicFile::create(&book.global_index_path())?;
    for entry in &entries {
        out.write_line(&serde_json::to_vec(entry)?)?;
    }
    out.commit()?;

    tracing::info!(streams = units.len(), entries = entries.len(), "global index rebuilt");
    Ok(entries.len())
}

fn write_order(entry: &GlobalIndexEntry) -> (bool, Option<i64>, &str, Stream, u64) {
    (
        entry.t.is_none(),
        entry.t,
        entry.address.as_str(),
        entry.stream,
        entry.offset,
    )
}

/// Compares a stream's unit index with a fresh derivation.
///
/// Only `(id, offset, len)` triples are compared; times may legitimately
/// differ under [`MissingTimePolicy::Now`].
///
/// # Errors
///
/// Returns an error if either file cannot be read.
pub fn inspect_unit(
    book: &BookDir,
    unit: &UnitAddress,
    stream: Stream,
    config: &Config,
) -> CoreResult<IndexState> {
    let data_path = book.data_path(unit, stream)?;
    if !data_path.is_file() {
        return Ok(IndexState::Absent);
    }
    let derived = derive_unit_entries(&data_path, config)?;

    let indexed: Vec<UnitIndexEntry> = match JsonLines::open(&book.index_path(unit, stream)?) {
        Ok(lines) => lines
            .map(|item| item.map(|(_, entry)| entry))
            .collect::<CoreResult<_>>()?,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e),
    };

    let same = indexed.len() == derived.len()
        && indexed.iter().zip(&derived).all(|(a, b)| a.key() == b.key());
    if same {
        Ok(IndexState::Consistent)
    } else {
        Ok(IndexState::Stale {
            indexed: indexed.len(),
            derived: derived.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    const DATA: &str = concat!(
        "{\"id\":\"a\",\"ts\":\"\",\"t\":100,\"content\":\"one\"}\n",
        "not json\n",
        "{\"id\":7,\"t\":101,\"content\":\"numeric id\"}\n",
        "{\"id\":\"b\",\"t\":\"soon\",\"content\":\"two\"}\n",
        "\n",
        "{\"id\":\"c\",\"t\":102,\"content\":\"three\"}\n",
    );

    fn setup() -> (tempfile::TempDir, BookDir, UnitAddress) {
        let root = tempdir().unwrap();
        let book = BookDir::open(root.path(), "book", true).unwrap();
        let unit = UnitAddress::parse("a/b").unwrap();
        let dir = book.ensure_unit_dir(&unit).unwrap();
        fs::write(dir.join("events.jsonl"), DATA).unwrap();
        (root, book, unit)
    }

    #[test]
    fn derive_skips_undecodable_lines() {
        let (_root, book, unit) = setup();
        let path = book.data_path(&unit, Stream::Events).unwrap();
        let entries = derive_unit_entries(&path, &Config::default()).unwrap();

        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[0].len, 43);
        assert_eq!(entries[1].t, None);
        assert_eq!(entries[2].t, Some(102));
    }

    #[test]
    fn now_policy_stamps_rebuild_time() {
        let (_root, book, unit) = setup();
        let path = book.data_path(&unit, Stream::Events).unwrap();
        let config = Config::new()
            .missing_time(MissingTimePolicy::Now)
            .clock(Arc::new(ManualClock::new(999)));

        let entries = derive_unit_entries(&path, &config).unwrap();
        assert_eq!(entries[1].t, Some(999));
    }

    #[test]
    fn rebuild_unit_is_byte_stable() {
        let (_root, book, unit) = setup();
        let config = Config::default();
        let index = book.index_path(&unit, Stream::Events).unwrap();

        assert_eq!(rebuild_unit(&book, &unit, Stream::Events, &config).unwrap(), 3);
        let first = fs::read(&index).unwrap();
        rebuild_unit(&book, &unit, Stream::Events, &config).unwrap();
        assert_eq!(fs::read(&index).unwrap(), first);
        assert!(!index.with_extension("jsonl.tmp").exists());
    }

    #[test]
    fn rebuild_global_orders_by_time() {
        let (_root, book, _) = setup();
        let other = UnitAddress::parse("a").unwrap();
        let dir = book.ensure_unit_dir(&other).unwrap();
        fs::write(
            dir.join("events.jsonl"),
            "{\"id\":\"early\",\"t\":50,\"content\":\"x\"}\n{\"id\":\"mid\",\"t\":101,\"content\":\"y\"}\n",
        )
        .unwrap();

        assert_eq!(rebuild_global(&book, &Config::default()).unwrap(), 5);
        let ids: Vec<String> = crate::journal::read_all::<GlobalIndexEntry>(&book.global_index_path())
            .unwrap()
            .into_iter()
            .map(|e| format!("{}:{}", e.address, e.id))
            .collect();
        assert_eq!(ids, ["a:early", "a/b:a", "a:mid", "a/b:c", "a/b:b"]);
    }

    #[test]
    fn rebuild_unit_without_data_is_not_found() {
        let (_root, book, unit) = setup();
        let err = rebuild_unit(&book, &unit, Stream::Summary, &Config::default()).unwrap_err();
        assert!(err.is_not_found());
        assert!(!book.index_path(&unit, Stream::Summary).unwrap().exists());
    }

    #[test]
    fn rebuild_global_covers_every_stream() {
        let (_root, book, unit) = setup();
        let other = UnitAddress::parse("z").unwrap();
        let dir = book.ensure_unit_dir(&other).unwrap();
        fs::write(dir.join("summary.jsonl"), "{\"id\":\"s\",\"t\":5,\"content\":\"x\"}\n").unwrap();

        assert_eq!(rebuild_global(&book, &Config::default()).unwrap(), 4);

        let entries: Vec<GlobalIndexEntry> =
            crate::journal::read_all(&book.global_index_path()).unwrap();
        assert_eq!(entries[0].address, unit.as_str());
        assert_eq!(entries[3].address, "z");
        assert_eq!(entries[3].stream, Stream::Summary);
    }

    #[test]
    fn inspect_reports_states() {
        let (_root, book, unit) = setup();
        let config = Config::default();

        assert_eq!(
            inspect_unit(&book, &unit, Stream::Summary, &config).unwrap(),
            IndexState::Absent
        );
        assert_eq!(
            inspect_unit(&book, &unit, Stream::Events, &config).unwrap(),
            IndexState::Stale { indexed: 0, derived: 3 }
        );

        rebuild_unit(&book, &unit, Stream::Events, &config).unwrap();
        assert_eq!(
            inspect_unit(&book, &unit, Stream::Events, &config).unwrap(),
            IndexState::Consistent
        );
    }
}
