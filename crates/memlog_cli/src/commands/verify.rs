//! Verify command implementation.

use memlog_core::{IndexState, JsonlStore, Stream};
use serde::Serialize;

/// State of one checked stream.
#[derive(Debug, Serialize)]
pub struct StreamReport {
    /// Unit address.
    pub unit: String,
    /// Stream name.
    pub stream: Stream,
    /// Index state.
    #[serde(flatten)]
    pub state: IndexState,
}

/// Verification result.
#[derive(Debug, Default, Serialize)]
pub struct VerifyResult {
    /// Number of streams checked.
    pub streams_checked: usize,
    /// Number of consistent streams.
    pub consistent: usize,
    /// Number of stale streams.
    pub stale: usize,
    /// Every checked stream.
    pub reports: Vec<StreamReport>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.stale == 0
    }
}

/// Runs the verify command.
///
/// Never repairs anything; stale indexes are fixed with `rebuild`.
pub fn run(store: &JsonlStore, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = verify(store)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "text" => print_result(store, &result),
        other => return Err(format!("unknown format {other:?} (expected text or json)").into()),
    }

    if result.is_ok() {
        Ok(())
    } else {
        Err(format!("{} stale index(es)", result.stale).into())
    }
}

fn verify(store: &JsonlStore) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();

    for (unit, stream) in store.units()? {
        let state = store.inspect_unit(unit.as_str(), stream)?;
        result.streams_checked += 1;
        match state {
            IndexState::Consistent => result.consistent += 1,
            IndexState::Stale { .. } => result.stale += 1,
            IndexState::Absent => {}
        }
        result.reports.push(StreamReport {
            unit: unit.to_string(),
            stream,
            state,
        });
    }

    Ok(result)
}

fn print_result(store: &JsonlStore, result: &VerifyResult) {
    println!("Verifying book at {}", store.layout().path().display());
    println!();

    for report in &result.reports {
        match report.state {
            IndexState::Consistent => println!("  ok     {} ({})", report.unit, report.stream),
            IndexState::Stale { indexed, derived } => println!(
                "  STALE  {} ({}): index has {} entries, data has {}",
                report.unit, report.stream, indexed, derived
            ),
            IndexState::Absent => println!("  absent {} ({})", report.unit, report.stream),
        }
    }

    println!();
    println!(
        "Streams checked: {}, consistent: {}, stale: {}",
        result.streams_checked, result.consistent, result.stale
    );
    if result.is_ok() {
        println!("✓ Book verification passed");
    } else {
        println!("✗ Book verification failed (run `memlog rebuild`)");
    }
}
