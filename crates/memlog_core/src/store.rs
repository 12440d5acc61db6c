//! Store façade.

use crate::address::{Stream, StreamAddress, UnitAddress};
use crate::cache::IdCache;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::index::{GlobalIndexEntry, Location, UnitIndexEntry};
use crate::journal::{self, JsonLines};
use crate::layout::BookDir;
use crate::query::{ResolvedQuery, Scope, TimeQuery};
use crate::rebuild::{self, IndexState};
use crate::record::Record;
use memlog_storage::FileBackend;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Append-only JSON-lines memory store for one book.
///
/// Every record lives in exactly one data file, addressed by unit and
/// stream. Each write appends to the data file, then to the stream's unit
/// index, then to the book's global index, and finally updates the
/// in-memory id cache.
///
/// # Consistency
///
/// The three appends are not transactional. If an index append fails the
/// write reports an I/O error but the data line stays on disk; running
/// [`rebuild_unit_index`](Self::rebuild_unit_index) and
/// [`rebuild_global_index`](Self::rebuild_global_index) reconciles the
/// indexes with the data.
///
/// # Concurrency
///
/// All methods take `&self`. Concurrent writers to the same stream never
/// interleave bytes within a line, but the relative order of their index
/// entries is unspecified. Only one process may use a book at a time.
///
/// # Example
///
/// ```rust,no_run
/// use memlog_core::{JsonlStore, TimeQuery};
/// use std::path::Path;
///
/// let store = JsonlStore::open(Path::new("memory"), "course-101")?;
/// let record = store.write("ch1/sec2", "hello")?;
///
/// assert_eq!(store.read("ch1/sec2")?.len(), 1);
/// assert_eq!(store.get_by_id(&record.id)?.content, "hello");
///
/// let recent = store.query_by_time(&TimeQuery::new("2024-01-01", i64::MAX).limit(5))?;
/// # let _ = recent;
/// # Ok::<(), memlog_core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct JsonlStore {
    layout: BookDir,
    config: Config,
    cache: IdCache,
}

impl JsonlStore {
    /// Opens the book `book_id` under `root` with default configuration,
    /// creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if `book_id` is not a single valid segment,
    /// or an I/O error.
    pub fn open(root: &Path, book_id: &str) -> CoreResult<Self> {
        Self::open_with_config(root, book_id, Config::default())
    }

    /// Opens a book with custom configuration.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open), plus `NotFound` if the book does not exist
    /// and `create_if_missing` is disabled.
    pub fn open_with_config(root: &Path, book_id: &str, config: Config) -> CoreResult<Self> {
        let layout = BookDir::open(root, book_id, config.create_if_missing)?;
        tracing::debug!(book = %layout.path().display(), "store opened");
        Ok(Self {
            layout,
            config,
            cache: IdCache::new(),
        })
    }

    /// The book directory layout.
    #[must_use]
    pub fn layout(&self) -> &BookDir {
        &self.layout
    }

    /// The store configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Appends `content` to the stream named by `address`.
    ///
    /// A plain unit address writes to its events stream; a trailing
    /// `__summary__` segment writes to its summary stream.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for an invalid address or an I/O error. An
    /// I/O error may leave the data line written without its index entries.
    pub fn write(&self, address: &str, content: &str) -> CoreResult<Record> {
        let target = StreamAddress::parse(address)?;
        let record = Record::new(content, self.config.clock.as_ref());
        self.append(&target, record)
    }

    /// Like [`write`](Self::write) for content that arrives as untyped JSON.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` if `content` is not a JSON string, otherwise
    /// as [`write`](Self::write).
    pub fn write_value(&self, address: &str, content: &Value) -> CoreResult<Record> {
        let target = StreamAddress::parse(address)?;
        let Value::String(text) = content else {
            return Err(CoreError::invalid_param(format!(
                "content must be a string, got {}",
                json_kind(content)
            )));
        };
        let record = Record::new(text.as_str(), self.config.clock.as_ref());
        self.append(&target, record)
    }

    /// Reads every record of the stream named by `address`, in write order.
    ///
    /// Lines that do not decode as records are skipped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for an invalid address, `NotFound` if the
    /// stream has never been written, or an I/O error.
    pub fn read(&self, address: &str) -> CoreResult<Vec<Record>> {
        let target = StreamAddress::parse(address)?;
        let path = self.layout.data_path(&target.unit, target.stream)?;
        let records: Vec<Record> = journal::read_all(&path).map_err(|e| {
            if e.is_not_found() {
                CoreError::not_found(target.to_string())
            } else {
                e
            }
        })?;
        tracing::debug!(address = %target, records = records.len(), "stream read");
        Ok(records)
    }

    /// Appends a summary for `unit_address`, recording the ids of the
    /// records it was derived from.
    ///
    /// The address may carry the `__summary__` marker or not; either way
    /// the unit's summary stream is written.
    ///
    /// # Errors
    ///
    /// As [`write`](Self::write).
    pub fn write_summary(
        &self,
        unit_address: &str,
        text: &str,
        source_ids: &[String],
    ) -> CoreResult<Record> {
        let unit = StreamAddress::parse(unit_address)?.unit;
        let record =
            Record::new(text, self.config.clock.as_ref()).with_source_ids(source_ids);
        self.append(&StreamAddress::new(unit, Stream::Summary), record)
    }

    /// Returns the most recent summary of `unit_address`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the unit has no decodable summary, otherwise as
    /// [`read`](Self::read).
    pub fn read_latest_summary(&self, unit_address: &str) -> CoreResult<Record> {
        let unit = StreamAddress::parse(unit_address)?.unit;
        let target = StreamAddress::new(unit, Stream::Summary);
        self.read(&target.to_string())?
            .pop()
            .ok_or_else(|| CoreError::not_found(target.to_string()))
    }

    /// Fetches one record by id from anywhere in the book.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParam` for an empty id, `NotFound` if the id is not
    /// indexed, or an I/O error if the indexed bytes cannot be read back as
    /// the requested record.
    pub fn get_by_id(&self, id: &str) -> CoreResult<Record> {
        if id.trim().is_empty() {
            return Err(CoreError::invalid_param("record id must not be empty"));
        }

        let location = self
            .cache
            .locate(id, &self.layout.global_index_path())?
            .ok_or_else(|| CoreError::not_found(format!("record {id}")))?;

        let record = RecordReader::new(&self.layout).read(&location)?;
        if record.id != id {
            tracing::warn!(id, found = %record.id, address = %location.unit, "index points at another record");
            return Err(CoreError::decode(
                location.span.offset,
                format!("expected record {id}, found {}", record.id),
            ));
        }
        Ok(record)
    }

    /// Returns the records whose time falls inside the query window, in
    /// index order.
    ///
    /// Records with an unknown time never match. Index entries whose record
    /// cannot be read back are skipped.
    ///
    /// # Errors
    ///
    /// - `InvalidParam` / `InvalidAddress` if the query does not resolve
    /// - `NotFound` if the index to scan does not exist
    /// - an I/O error if the index cannot be read
    pub fn query_by_time(&self, query: &TimeQuery) -> CoreResult<Vec<Record>> {
        let resolved = query.resolve()?;
        let mut reader = RecordReader::new(&self.layout);

        let records = match &resolved.scope {
            Scope::Book { stream } => {
                let path = self.layout.global_index_path();
                if !path.is_file() {
                    return Err(CoreError::not_found("global index"));
                }
                let filter = *stream;
                collect_matches(
                    JsonLines::<GlobalIndexEntry>::open(&path)?,
                    &resolved,
                    &mut reader,
                    |entry| {
                        if filter.is_some_and(|s| s != entry.stream) {
                            return None;
                        }
                        Some((entry.t, entry.location()))
                    },
                )?
            }
            Scope::Unit(target) => {
                let path = self.layout.index_path(&target.unit, target.stream)?;
                if !path.is_file() {
                    return Err(CoreError::not_found(format!("index of {target}")));
                }
                collect_matches(
                    JsonLines::<UnitIndexEntry>::open(&path)?,
                    &resolved,
                    &mut reader,
                    |entry| {
                        let location = Location {
                            unit: target.unit.clone(),
                            stream: target.stream,
                            span: entry.span(),
                        };
                        Some((entry.t, Ok(location)))
                    },
                )?
            }
        };

        tracing::debug!(
            from = resolved.from,
            to = resolved.to,
            records = records.len(),
            "time query"
        );
        Ok(records)
    }

    /// Rebuilds one stream's unit index from its data file.
    ///
    /// Returns the number of indexed records.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for an invalid unit address, `NotFound` if
    /// the stream has no data file, or an I/O error.
    pub fn rebuild_unit_index(&self, unit_address: &str, stream: Stream) -> CoreResult<usize> {
        let unit = UnitAddress::parse(unit_address)?;
        rebuild::rebuild_unit(&self.layout, &unit, stream, &self.config)
    }

    /// Rebuilds the global index from every data file in the book and
    /// drops the id cache.
    ///
    /// Returns the number of indexed records.
    ///
    /// # Errors
    ///
    /// Returns an I/O error; the previous index is then left in place.
    pub fn rebuild_global_index(&self) -> CoreResult<usize> {
        let count = rebuild::rebuild_global(&self.layout, &self.config)?;
        self.cache.invalidate();
        Ok(count)
    }

    /// Reports whether a stream's unit index matches its data file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for an invalid unit address or an I/O error.
    pub fn inspect_unit(&self, unit_address: &str, stream: Stream) -> CoreResult<IndexState> {
        let unit = UnitAddress::parse(unit_address)?;
        rebuild::inspect_unit(&self.layout, &unit, stream, &self.config)
    }

    /// Lists every `(unit, stream)` with a data file, sorted.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the book cannot be walked.
    pub fn units(&self) -> CoreResult<Vec<(UnitAddress, Stream)>> {
        self.layout.units()
    }

    fn append(&self, target: &StreamAddress, record: Record) -> CoreResult<Record> {
        let sync = self.config.sync_on_append;
        let dir = self.layout.ensure_unit_dir(&target.unit)?;

        let span = journal::append_json_line(&dir.join(target.stream.data_file_name()), &record, sync)?;

        let entry = UnitIndexEntry::new(record.id.clone(), record.created_at_epoch, span);
        journal::append_json_line(&dir.join(target.stream.index_file_name()), &entry, sync)
            .inspect_err(|e| {
                tracing::warn!(address = %target, id = %record.id, error = %e, "unit index append failed");
            })?;

        let global = GlobalIndexEntry::for_unit(&target.unit, target.stream, &entry);
        journal::append_json_line(&self.layout.global_index_path(), &global, sync)
            .inspect_err(|e| {
                tracing::warn!(address = %target, id = %record.id, error = %e, "global index append failed");
            })?;

        self.cache.insert(
            record.id.clone(),
            Location {
                unit: target.unit.clone(),
                stream: target.stream,
                span,
            },
        );

        tracing::debug!(
            address = %target,
            id = %record.id,
            offset = span.offset,
            len = span.len,
            "record written"
        );
        Ok(record)
    }
}

/// Scans index entries, keeping the records inside the query window.
fn collect_matches<E, F>(
    entries: JsonLines<E>,
    query: &ResolvedQuery,
    reader: &mut RecordReader<'_>,
    mut locate: F,
) -> CoreResult<Vec<Record>>
where
    E: serde::de::DeserializeOwned,
    F: FnMut(&E) -> Option<(Option<i64>, CoreResult<Location>)>,
{
    let mut records = Vec::new();
    for item in entries {
        let (_, entry) = item?;
        let Some((t, location)) = locate(&entry) else {
            continue;
        };
        if !query.matches(t) {
            continue;
        }

        let resolved = location.and_then(|location| reader.read(&location));
        match resolved {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable index entry");
                continue;
            }
        }

        if query.is_full(records.len()) {
            break;
        }
    }
    Ok(records)
}

/// Range reader that keeps one read-only handle per data file.
struct RecordReader<'a> {
    layout: &'a BookDir,
    handles: HashMap<(UnitAddress, Stream), FileBackend>,
}

impl<'a> RecordReader<'a> {
    fn new(layout: &'a BookDir) -> Self {
        Self {
            layout,
            handles: HashMap::new(),
        }
    }

    fn read(&mut self, location: &Location) -> CoreResult<Record> {
        let key = (location.unit.clone(), location.stream);
        let backend = match self.handles.entry(key) {
            std::collections::hash_map::Entry::Occupied(slot) => slot.into_mut(),
            std::collections::hash_map::Entry::Vacant(slot) => {
                let path = self.layout.data_path(&location.unit, location.stream)?;
                slot.insert(FileBackend::open_existing(&path)?)
            }
        };
        journal::read_json_at(backend, location.span)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
