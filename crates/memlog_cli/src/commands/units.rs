//! Units command implementation.

use memlog_core::JsonlStore;

/// Runs the units command.
pub fn run(store: &JsonlStore) -> Result<(), Box<dyn std::error::Error>> {
    for (unit, stream) in store.units()? {
        println!("{unit}\t{stream}");
    }
    Ok(())
}
