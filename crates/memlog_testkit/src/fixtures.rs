//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up throwaway books and
//! common test scenarios.

use memlog_core::{Config, JsonlStore, ManualClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Book id used by every fixture store.
pub const TEST_BOOK: &str = "test-book";

/// Epoch the fixture clock starts at (2024-05-01T10:00:00Z).
pub const TEST_EPOCH: i64 = 1_714_557_600;

/// A store in a temporary directory, driven by a manual clock.
pub struct TestStore {
    /// The store instance.
    pub store: JsonlStore,
    /// The clock stamping new records.
    pub clock: Arc<ManualClock>,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestStore {
    /// Creates a store whose clock starts at [`TEST_EPOCH`].
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Creates a store with custom configuration. The clock is always
    /// replaced by a fresh manual clock.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let clock = Arc::new(ManualClock::new(TEST_EPOCH));
        let store = JsonlStore::open_with_config(
            temp_dir.path(),
            TEST_BOOK,
            config.clock(clock.clone()),
        )
        .expect("Failed to open test store");

        Self {
            store,
            clock,
            temp_dir,
        }
    }

    /// Root directory holding the book.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of the book directory.
    pub fn book_path(&self) -> PathBuf {
        self.store.layout().path().to_path_buf()
    }

    /// Path of a file inside the book, given relative to the book.
    pub fn file(&self, relative: &str) -> PathBuf {
        self.book_path().join(relative)
    }

    /// Drops the in-memory state and opens the same book again.
    pub fn reopen(&mut self) {
        let config = self.store.config().clone();
        self.store = JsonlStore::open_with_config(self.temp_dir.path(), TEST_BOOK, config)
            .expect("Failed to reopen test store");
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = JsonlStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary store.
///
/// # Example
///
/// ```rust
/// use memlog_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     store.write("unit", "hello").unwrap();
///     assert_eq!(store.read("unit").unwrap().len(), 1);
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let test_store = TestStore::new();
    f(&test_store)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use memlog_core::Record;

    /// Creates a store with `per_unit` events in each of `units` units,
    /// one second apart. Units are named `unit-0`, `unit-1`, ...
    pub fn populated_store(units: usize, per_unit: usize) -> (TestStore, Vec<Record>) {
        let test_store = TestStore::new();
        let mut written = Vec::with_capacity(units * per_unit);

        for i in 0..per_unit {
            for u in 0..units {
                let record = test_store
                    .write(&format!("unit-{u}"), &format!("event {i}"))
                    .expect("Failed to write event");
                written.push(record);
                test_store.clock.advance(1);
            }
        }

        (test_store, written)
    }
}
