//! Rebuild command implementation.

use memlog_core::{JsonlStore, Stream};

/// Runs the rebuild command.
///
/// With a unit, rebuilds that unit's index for `stream`; without one,
/// rebuilds the global index.
pub fn run(store: &JsonlStore, unit: Option<&str>, stream: &str) -> Result<(), Box<dyn std::error::Error>> {
    match unit {
        Some(unit) => {
            let stream: Stream = stream.parse()?;
            let count = store.rebuild_unit_index(unit, stream)?;
            println!("Rebuilt {unit} ({stream}): {count} entries");
        }
        None => {
            let count = store.rebuild_global_index()?;
            println!("Rebuilt global index: {count} entries");
        }
    }
    Ok(())
}
