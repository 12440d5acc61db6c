//! Stress tests for memlog.
//!
//! These helpers exercise a store under heavy load and concurrent access.
//! Concurrent writers share one store and rely on append-mode writes, so
//! every line must come out whole even when writers target the same
//! stream.

use memlog_core::JsonlStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Size of record content in bytes.
    pub content_size: usize,
    /// Number of distinct units written to.
    pub unit_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 2_000,
            threads: 4,
            content_size: 256,
            unit_count: 8,
        }
    }
}

impl StressConfig {
    /// A small configuration suitable for unit tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            operations: 200,
            threads: 4,
            content_size: 64,
            unit_count: 3,
        }
    }
}

fn unit_name(i: usize) -> String {
    format!("stress/unit-{i}")
}

/// Run a sequential write stress test, spreading writes over the units.
pub fn stress_sequential_writes(store: &JsonlStore, config: &StressConfig) -> StressTestResult {
    let content = "x".repeat(config.content_size);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        match store.write(&unit_name(i % config.unit_count), &content) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent write stress test.
///
/// With `same_stream` every thread appends to one unit; otherwise each
/// thread has its own unit. Each record's content names its thread and
/// sequence number so readers can check nothing was torn or lost.
pub fn stress_concurrent_writes(
    store: Arc<JsonlStore>,
    config: &StressConfig,
    same_stream: bool,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads;
    let padding = "p".repeat(config.content_size);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let padding = padding.clone();
            let address = if same_stream { unit_name(0) } else { unit_name(t) };

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let content = format!("{t}:{i}:{padding}");
                    match store.write(&address, &content) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a concurrent id lookup stress test against records written first.
pub fn stress_concurrent_reads(store: Arc<JsonlStore>, config: &StressConfig) -> StressTestResult {
    let ids: Arc<Vec<String>> = Arc::new(
        (0..config.unit_count.max(1) * 4)
            .filter_map(|i| {
                store
                    .write(&unit_name(i % config.unit_count.max(1)), "seed")
                    .ok()
                    .map(|r| r.id)
            })
            .collect(),
    );

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let ids = Arc::clone(&ids);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let id = &ids[(t + i) % ids.len()];
                    match store.get_by_id(id) {
                        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestStore;
    use memlog_core::{IndexState, Stream};
    use std::collections::HashSet;

    fn shared_store() -> (tempfile::TempDir, Arc<JsonlStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::open(dir.path(), "stress").unwrap();
        (dir, Arc::new(store))
    }

    #[test]
    fn sequential_writes_all_succeed() {
        let test_store = TestStore::new();
        let config = StressConfig::quick();
        let result = stress_sequential_writes(&test_store, &config);

        assert_eq!(result.failed_ops, 0);
        let total: usize = (0..config.unit_count)
            .map(|u| test_store.read(&unit_name(u)).unwrap().len())
            .sum();
        assert_eq!(total, config.operations);
    }

    #[test]
    fn concurrent_writes_to_one_stream_stay_whole() {
        let (_dir, store) = shared_store();
        let config = StressConfig::quick();
        let result = stress_concurrent_writes(Arc::clone(&store), &config, true);
        assert_eq!(result.failed_ops, 0);

        let records = store.read(&unit_name(0)).unwrap();
        assert_eq!(records.len(), result.successful_ops);

        let seen: HashSet<(String, String)> = records
            .iter()
            .map(|r| {
                let mut parts = r.content.splitn(3, ':');
                (
                    parts.next().unwrap().to_string(),
                    parts.next().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(seen.len(), records.len());

        for record in &records {
            assert_eq!(store.get_by_id(&record.id).unwrap(), *record);
        }

        // Index entries of racing writers may be ordered differently from
        // their data lines; a rebuild restores file order.
        store.rebuild_unit_index(&unit_name(0), Stream::Events).unwrap();
        assert_eq!(
            store.inspect_unit(&unit_name(0), Stream::Events).unwrap(),
            IndexState::Consistent
        );
    }

    #[test]
    fn concurrent_writes_to_separate_streams() {
        let (_dir, store) = shared_store();
        let config = StressConfig::quick();
        let result = stress_concurrent_writes(Arc::clone(&store), &config, false);
        assert_eq!(result.failed_ops, 0);

        let per_thread = config.operations / config.threads;
        for t in 0..config.threads {
            let records = store.read(&unit_name(t)).unwrap();
            assert_eq!(records.len(), per_thread);
            for (i, record) in records.iter().enumerate() {
                assert!(record.content.starts_with(&format!("{t}:{i}:")));
            }
        }
        assert_eq!(store.rebuild_global_index().unwrap(), config.operations);
    }

    #[test]
    fn concurrent_reads_all_succeed() {
        let (_dir, store) = shared_store();
        let result = stress_concurrent_reads(store, &StressConfig::quick());
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 200);
    }
}
