//! In-memory identifier cache.
//!
//! Maps record ids to their [`Location`]. The cache is derived entirely
//! from the global index: it is hydrated by one full scan on first use,
//! kept current by every write, and can be dropped at any time.

use crate::error::CoreResult;
use crate::index::{GlobalIndexEntry, Location};
use crate::journal::JsonLines;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Default)]
struct CacheState {
    loaded: bool,
    entries: HashMap<String, Location>,
}

/// Lazily hydrated id to location map owned by one store.
#[derive(Debug, Default)]
pub struct IdCache {
    state: RwLock<CacheState>,
}

impl IdCache {
    /// Creates an empty, unhydrated cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `id`, hydrating from `global_index` first if needed.
    ///
    /// A missing global index hydrates to an empty map. Writes that happen
    /// before hydration are kept; the scan fills in everything else.
    ///
    /// # Errors
    ///
    /// Returns an error if the global index cannot be read. The cache stays
    /// unhydrated so the next lookup retries.
    pub fn locate(&self, id: &str, global_index: &Path) -> CoreResult<Option<Location>> {
        {
            let state = self.state.read();
            if state.loaded {
                return Ok(state.entries.get(id).cloned());
            }
        }

        let mut state = self.state.write();
        if !state.loaded {
            let scanned = scan_global(global_index)?;
            for (key, location) in scanned {
                state.entries.entry(key).or_insert(location);
            }
            state.loaded = true;
            tracing::debug!(entries = state.entries.len(), "id cache hydrated");
        }
        Ok(state.entries.get(id).cloned())
    }

    /// Records the location of a freshly written record.
    pub fn insert(&self, id: impl Into<String>, location: Location) {
        self.state.write().entries.insert(id.into(), location);
    }

    /// Drops every entry and forces re-hydration on the next lookup.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.loaded = false;
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true once the global index has been scanned.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }
}

/// Reads the global index into a map. Later entries for the same id win,
/// matching a scan that stops at the last write.
fn scan_global(path: &Path) -> CoreResult<HashMap<String, Location>> {
    let mut entries = HashMap::new();
    let lines = match JsonLines::<GlobalIndexEntry>::open(path) {
        Ok(lines) => lines,
        Err(e) if e.is_not_found() => return Ok(entries),
        Err(e) => return Err(e),
    };

    for item in lines {
        let (_, entry) = item?;
        match entry.location() {
            Ok(location) => {
                entries.insert(entry.id, location);
            }
            Err(e) => {
                tracing::warn!(id = %entry.id, error = %e, "skipping global index entry");
            }
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Stream, UnitAddress};
    use crate::journal::append_json_line;
    use memlog_storage::LineSpan;
    use std::fs;
    use tempfile::tempdir;

    fn global(id: &str, address: &str, offset: u64) -> GlobalIndexEntry {
        GlobalIndexEntry {
            id: id.into(),
            t: Some(1),
            address: address.into(),
            stream: Stream::Events,
            offset,
            len: 10,
        }
    }

    #[test]
    fn hydrates_once_from_global_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_global_index.jsonl");
        append_json_line(&path, &global("a", "u", 0), false).unwrap();
        append_json_line(&path, &global("b", "u/v", 10), false).unwrap();

        let cache = IdCache::new();
        assert!(!cache.is_loaded());

        let found = cache.locate("b", &path).unwrap().unwrap();
        assert_eq!(found.unit.as_str(), "u/v");
        assert_eq!(found.span, LineSpan { offset: 10, len: 10 });
        assert!(cache.is_loaded());
        assert_eq!(cache.len(), 2);

        fs::remove_file(&path).unwrap();
        assert!(cache.locate("a", &path).unwrap().is_some());
        assert!(cache.locate("zzz", &path).unwrap().is_none());
    }

    #[test]
    fn missing_index_hydrates_empty() {
        let dir = tempdir().unwrap();
        let cache = IdCache::new();
        assert!(cache
            .locate("a", &dir.path().join("absent.jsonl"))
            .unwrap()
            .is_none());
        assert!(cache.is_loaded());
        assert!(cache.is_empty());
    }

    #[test]
    fn inserts_survive_hydration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_global_index.jsonl");
        append_json_line(&path, &global("old", "u", 0), false).unwrap();

        let cache = IdCache::new();
        cache.insert(
            "new",
            Location {
                unit: UnitAddress::parse("w").unwrap(),
                stream: Stream::Summary,
                span: LineSpan { offset: 5, len: 6 },
            },
        );

        assert_eq!(cache.locate("new", &path).unwrap().unwrap().stream, Stream::Summary);
        assert!(cache.locate("old", &path).unwrap().is_some());
    }

    #[test]
    fn invalidate_forces_rescan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_global_index.jsonl");
        let cache = IdCache::new();
        assert!(cache.locate("a", &path).unwrap().is_none());

        append_json_line(&path, &global("a", "u", 0), false).unwrap();
        assert!(cache.locate("a", &path).unwrap().is_none());

        cache.invalidate();
        assert!(!cache.is_loaded());
        assert!(cache.locate("a", &path).unwrap().is_some());
    }

    #[test]
    fn bad_addresses_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_global_index.jsonl");
        append_json_line(&path, &global("bad", "../x", 0), false).unwrap();
        append_json_line(&path, &global("good", "x", 0), false).unwrap();

        let cache = IdCache::new();
        assert!(cache.locate("bad", &path).unwrap().is_none());
        assert!(cache.locate("good", &path).unwrap().is_some());
    }
}
