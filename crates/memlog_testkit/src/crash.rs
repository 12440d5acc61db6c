//! Crash reconciliation testing for memlog.
//!
//! A write touches three files in order: the data file, the unit index and
//! the global index. A crash between any two of them leaves the indexes
//! behind the data. This module reproduces those states by cutting files
//! back to their pre-write length, then checks that reads degrade the way
//! they should and that the rebuild operations restore every lookup.
//!
//! ## Usage
//!
//! ```rust
//! use memlog_testkit::crash::{CrashPoint, CrashRecoveryHarness};
//!
//! let mut harness = CrashRecoveryHarness::new();
//! let result = harness.run(CrashPoint::AfterDataAppend);
//! assert!(result.passed, "{:?}", result.error);
//! ```

use crate::fixtures::TestStore;
use memlog_core::{CoreError, IndexState, Record, Status, Stream, TimeQuery};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Points at which a crash can be simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// The data line was written; neither index entry was.
    AfterDataAppend,
    /// The data line and unit index entry were written; the global entry
    /// was not.
    AfterUnitIndexAppend,
    /// The data file ends with a partial, unterminated line.
    TornDataLine,
    /// A unit index file was lost.
    LostUnitIndex,
    /// The global index file was lost.
    LostGlobalIndex,
}

impl CrashPoint {
    /// Every crash point, in write order.
    pub const ALL: [CrashPoint; 5] = [
        CrashPoint::AfterDataAppend,
        CrashPoint::AfterUnitIndexAppend,
        CrashPoint::TornDataLine,
        CrashPoint::LostUnitIndex,
        CrashPoint::LostGlobalIndex,
    ];

    /// Records reachable by id once the book is reconciled.
    fn expected_records(self) -> usize {
        match self {
            Self::TornDataLine => SEEDED,
            _ => SEEDED + 1,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::AfterDataAppend => "Crash after data append",
            Self::AfterUnitIndexAppend => "Crash after unit index append",
            Self::TornDataLine => "Torn trailing data line",
            Self::LostUnitIndex => "Lost unit index",
            Self::LostGlobalIndex => "Lost global index",
        }
    }
}

/// Result of a crash recovery test.
#[derive(Debug, Clone)]
pub struct CrashRecoveryResult {
    /// Whether the test passed.
    pub passed: bool,
    /// Description of what was tested.
    pub description: String,
    /// Records expected to be reachable after recovery.
    pub expected_records: usize,
    /// Records actually reachable after recovery.
    pub actual_records: usize,
    /// Any error message.
    pub error: Option<String>,
}

impl CrashRecoveryResult {
    /// Creates a passing result.
    pub fn pass(description: &str, records: usize) -> Self {
        Self {
            passed: true,
            description: description.to_string(),
            expected_records: records,
            actual_records: records,
            error: None,
        }
    }

    /// Creates a failing result.
    pub fn fail(description: &str, expected: usize, actual: usize, error: &str) -> Self {
        Self {
            passed: false,
            description: description.to_string(),
            expected_records: expected,
            actual_records: actual,
            error: Some(error.to_string()),
        }
    }
}

/// Shorthand for a failed check inside a scenario.
fn check(condition: bool, message: &str) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(message.to_string())
    }
}

fn core(e: CoreError) -> String {
    format!("[{}] {e}", e.status())
}

fn io(e: std::io::Error) -> String {
    e.to_string()
}

fn file_len(path: &Path) -> Result<u64, String> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(io(e)),
    }
}

fn truncate_to(path: &Path, len: u64) -> Result<(), String> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|f| f.set_len(len))
        .map_err(io)
}

/// Test harness for crash reconciliation scenarios.
///
/// Each scenario runs against a fresh store in its own temporary
/// directory.
pub struct CrashRecoveryHarness {
    /// Results of crash recovery tests.
    pub results: Vec<CrashRecoveryResult>,
}

const UNIT: &str = "crash/unit";
const SEEDED: usize = 3;

impl CrashRecoveryHarness {
    /// Creates a new crash recovery harness.
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    /// Runs one scenario and records its result.
    pub fn run(&mut self, point: CrashPoint) -> CrashRecoveryResult {
        let description = point.description();
        let outcome = match point {
            CrashPoint::AfterDataAppend => Self::after_data_append(),
            CrashPoint::AfterUnitIndexAppend => Self::after_unit_index_append(),
            CrashPoint::TornDataLine => Self::torn_data_line(),
            CrashPoint::LostUnitIndex => Self::lost_unit_index(),
            CrashPoint::LostGlobalIndex => Self::lost_global_index(),
        };

        let expected = point.expected_records();
        let result = match outcome {
            Ok(reachable) if reachable == expected => CrashRecoveryResult::pass(description, reachable),
            Ok(reachable) => CrashRecoveryResult::fail(
                description,
                expected,
                reachable,
                "records missing after recovery",
            ),
            Err(e) => CrashRecoveryResult::fail(description, expected, 0, &e),
        };
        self.results.push(result.clone());
        result
    }

    /// Writes the seed records one second apart.
    fn seeded() -> Result<(TestStore, Vec<Record>), String> {
        let test_store = TestStore::new();
        let mut records = Vec::new();
        for i in 0..SEEDED {
            records.push(test_store.write(UNIT, &format!("seed {i}")).map_err(core)?);
            test_store.clock.advance(1);
        }
        Ok((test_store, records))
    }

    /// Rebuilds both indexes and counts the records reachable by id.
    fn reconcile(test_store: &TestStore, records: &[Record]) -> Result<usize, String> {
        test_store
            .rebuild_unit_index(UNIT, Stream::Events)
            .map_err(core)?;
        test_store.rebuild_global_index().map_err(core)?;
        check(
            test_store.inspect_unit(UNIT, Stream::Events).map_err(core)? == IndexState::Consistent,
            "unit index stale after rebuild",
        )?;

        let mut reachable = 0;
        for record in records {
            if test_store.get_by_id(&record.id).map_err(core)? == *record {
                reachable += 1;
            }
        }
        Ok(reachable)
    }

    /// Appends one record, then cuts the named index files back to their
    /// length before the append.
    fn crashed_write(test_store: &mut TestStore, cut_unit_index: bool) -> Result<Record, String> {
        let unit_index = test_store.file(&format!("{UNIT}/events.index.jsonl"));
        let global_index = test_store.file(memlog_core::GLOBAL_INDEX_FILE);
        let unit_len = file_len(&unit_index)?;
        let global_len = file_len(&global_index)?;

        let record = test_store.write(UNIT, "last words").map_err(core)?;

        if cut_unit_index {
            truncate_to(&unit_index, unit_len)?;
        }
        truncate_to(&global_index, global_len)?;
        test_store.reopen();
        Ok(record)
    }

    fn after_data_append() -> Result<usize, String> {
        let (mut test_store, mut records) = Self::seeded()?;
        let lost = Self::crashed_write(&mut test_store, true)?;

        check(
            test_store.read(UNIT).map_err(core)?.last() == Some(&lost),
            "data line missing from read",
        )?;
        check(
            test_store.inspect_unit(UNIT, Stream::Events).map_err(core)?
                == IndexState::Stale {
                    indexed: SEEDED,
                    derived: SEEDED + 1,
                },
            "crash not detected as stale unit index",
        )?;
        check(
            Status::of(&test_store.get_by_id(&lost.id)) == Status::NotFound,
            "unindexed record found by id",
        )?;
        let window = TimeQuery::new(0i64, i64::MAX).address(UNIT);
        check(
            test_store.query_by_time(&window).map_err(core)?.len() == SEEDED,
            "unindexed record matched a time query",
        )?;

        records.push(lost);
        Self::reconcile(&test_store, &records)
    }

    fn after_unit_index_append() -> Result<usize, String> {
        let (mut test_store, mut records) = Self::seeded()?;
        let lost = Self::crashed_write(&mut test_store, false)?;

        check(
            test_store.inspect_unit(UNIT, Stream::Events).map_err(core)? == IndexState::Consistent,
            "unit index should be whole",
        )?;
        check(
            Status::of(&test_store.get_by_id(&lost.id)) == Status::NotFound,
            "record without global entry found by id",
        )?;
        let window = TimeQuery::new(0i64, i64::MAX);
        check(
            test_store.query_by_time(&window.clone().address(UNIT)).map_err(core)?.len()
                == SEEDED + 1,
            "unit scoped query should see the record",
        )?;
        check(
            test_store.query_by_time(&window).map_err(core)?.len() == SEEDED,
            "book query should not see the record",
        )?;

        records.push(lost);
        Self::reconcile(&test_store, &records)
    }

    fn torn_data_line() -> Result<usize, String> {
        let (mut test_store, records) = Self::seeded()?;
        let data = test_store.file(&format!("{UNIT}/events.jsonl"));
        let mut file = OpenOptions::new().append(true).open(&data).map_err(io)?;
        file.write_all(b"{\"id\":\"torn\",\"ts\":\"2024-05-01T10:0")
            .map_err(io)?;
        drop(file);
        test_store.reopen();

        check(
            test_store.read(UNIT).map_err(core)? == records,
            "torn line should be skipped on read",
        )?;
        check(
            test_store.inspect_unit(UNIT, Stream::Events).map_err(core)? == IndexState::Consistent,
            "torn line should not be indexed",
        )?;
        check(
            test_store
                .rebuild_unit_index(UNIT, Stream::Events)
                .map_err(core)?
                == SEEDED,
            "rebuild should skip the torn line",
        )?;
        Self::reconcile(&test_store, &records)
    }

    fn lost_unit_index() -> Result<usize, String> {
        let (mut test_store, mut records) = Self::seeded()?;
        records.push(test_store.write(UNIT, "indexed").map_err(core)?);
        fs::remove_file(test_store.file(&format!("{UNIT}/events.index.jsonl"))).map_err(io)?;
        test_store.reopen();

        let window = TimeQuery::new(0i64, i64::MAX).address(UNIT);
        check(
            Status::of(&test_store.query_by_time(&window)) == Status::NotFound,
            "unit query without index should be NotFound",
        )?;
        check(
            test_store.read(UNIT).map_err(core)? == records,
            "reads do not depend on the index",
        )?;
        Self::reconcile(&test_store, &records)
    }

    fn lost_global_index() -> Result<usize, String> {
        let (mut test_store, mut records) = Self::seeded()?;
        records.push(test_store.write(UNIT, "indexed").map_err(core)?);
        fs::remove_file(test_store.file(memlog_core::GLOBAL_INDEX_FILE)).map_err(io)?;
        test_store.reopen();

        check(
            Status::of(&test_store.get_by_id(&records[0].id)) == Status::NotFound,
            "id lookup without global index should be NotFound",
        )?;
        Self::reconcile(&test_store, &records)
    }

    /// Runs every scenario.
    pub fn run_all_tests(&mut self) -> Vec<CrashRecoveryResult> {
        CrashPoint::ALL.iter().map(|point| self.run(*point)).collect()
    }

    /// Returns a summary of all test results.
    pub fn summary(&self) -> String {
        let passed = self.results.iter().filter(|r| r.passed).count();
        let mut summary = format!(
            "Crash Recovery Tests: {}/{} passed\n",
            passed,
            self.results.len()
        );
        for result in &self.results {
            let status = if result.passed { "✓" } else { "✗" };
            summary.push_str(&format!("  {} {}\n", status, result.description));
            if let Some(ref error) = result.error {
                summary.push_str(&format!("    Error: {}\n", error));
            }
        }
        summary
    }

    /// Returns true if all tests passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}

impl Default for CrashRecoveryHarness {
    fn default() -> Self {
        Self::new()
    }
}
