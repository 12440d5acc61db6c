//! Capability traits for memory backends.
//!
//! Callers that only need to append and read text program against
//! [`Memory`]. The search and maintenance operations live in
//! [`EnhancedMemory`], which a backend may or may not offer; probe for it
//! with [`Memory::enhanced`].

use crate::address::Stream;
use crate::error::CoreResult;
use crate::query::TimeQuery;
use crate::record::Record;
use crate::store::JsonlStore;
use std::path::Path;

/// The minimal memory surface: append and read by address.
pub trait Memory: Send + Sync {
    /// Appends `content` to the stream named by `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the write fails.
    fn write(&self, address: &str, content: &str) -> CoreResult<Record>;

    /// Reads every record of the stream named by `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, the stream has never
    /// been written, or the read fails.
    fn read(&self, address: &str) -> CoreResult<Vec<Record>>;

    /// The extended capability set, if this backend has one.
    fn enhanced(&self) -> Option<&dyn EnhancedMemory> {
        None
    }
}

/// Search, provenance and index maintenance on top of [`Memory`].
pub trait EnhancedMemory: Memory {
    /// Appends a summary to a unit, with the ids it was derived from.
    fn write_summary(&self, unit_address: &str, text: &str, source_ids: &[String])
        -> CoreResult<Record>;

    /// The last summary written to a unit.
    fn read_latest_summary(&self, unit_address: &str) -> CoreResult<Record>;

    /// One record by id.
    fn get_by_id(&self, id: &str) -> CoreResult<Record>;

    /// Records inside a time window.
    fn query_by_time(&self, query: &TimeQuery) -> CoreResult<Vec<Record>>;

    /// Re-derives one stream's unit index.
    fn rebuild_unit_index(&self, unit_address: &str, stream: Stream) -> CoreResult<usize>;

    /// Re-derives the book-wide index.
    fn rebuild_global_index(&self) -> CoreResult<usize>;
}

impl Memory for JsonlStore {
    fn write(&self, address: &str, content: &str) -> CoreResult<Record> {
        JsonlStore::write(self, address, content)
    }

    fn read(&self, address: &str) -> CoreResult<Vec<Record>> {
        JsonlStore::read(self, address)
    }

    fn enhanced(&self) -> Option<&dyn EnhancedMemory> {
        Some(self)
    }
}

impl EnhancedMemory for JsonlStore {
    fn write_summary(
        &self,
        unit_address: &str,
        text: &str,
        source_ids: &[String],
    ) -> CoreResult<Record> {
        JsonlStore::write_summary(self, unit_address, text, source_ids)
    }

    fn read_latest_summary(&self, unit_address: &str) -> CoreResult<Record> {
        JsonlStore::read_latest_summary(self, unit_address)
    }

    fn get_by_id(&self, id: &str) -> CoreResult<Record> {
        JsonlStore::get_by_id(self, id)
    }

    fn query_by_time(&self, query: &TimeQuery) -> CoreResult<Vec<Record>> {
        JsonlStore::query_by_time(self, query)
    }

    fn rebuild_unit_index(&self, unit_address: &str, stream: Stream) -> CoreResult<usize> {
        JsonlStore::rebuild_unit_index(self, unit_address, stream)
    }

    fn rebuild_global_index(&self) -> CoreResult<usize> {
        JsonlStore::rebuild_global_index(self)
    }
}

/// Opens the default backend for `book_id` under `root`.
///
/// Lets callers depend on [`Memory`] only, so the backend can change
/// without touching them.
///
/// # Errors
///
/// Returns an error if the book cannot be opened.
pub fn open_memory(root: &Path, book_id: &str) -> CoreResult<Box<dyn Memory>> {
    Ok(Box::new(JsonlStore::open(root, book_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn factory_exposes_enhanced_capability() {
        let root = tempdir().unwrap();
        let memory = open_memory(root.path(), "book").unwrap();
        let record = memory.write("a", "hello").unwrap();
        assert_eq!(memory.read("a").unwrap().len(), 1);

        let enhanced = memory.enhanced().expect("jsonl store is enhanced");
        assert_eq!(enhanced.get_by_id(&record.id).unwrap().content, "hello");
        assert_eq!(enhanced.rebuild_global_index().unwrap(), 1);
    }

    #[derive(Default)]
    struct Plain(parking_lot::Mutex<Vec<Record>>);

    impl Memory for Plain {
        fn write(&self, _address: &str, content: &str) -> CoreResult<Record> {
            let record = Record::new(content, &crate::clock::ManualClock::new(0));
            self.0.lock().push(record.clone());
            Ok(record)
        }

        fn read(&self, _address: &str) -> CoreResult<Vec<Record>> {
            Ok(self.0.lock().clone())
        }
    }

    #[test]
    fn minimal_backend_has_no_enhanced_capability() {
        let plain: Box<dyn Memory> = Box::new(Plain::default());
        plain.write("a", "x").unwrap();
        assert_eq!(plain.read("a").unwrap().len(), 1);
        assert!(plain.enhanced().is_none());
    }
}
