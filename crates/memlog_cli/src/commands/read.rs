//! Read-side command implementations.

use crate::output::{print_record, print_records, Format};
use memlog_core::JsonlStore;

/// Runs the read command.
pub fn read(store: &JsonlStore, address: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;
    let records = store.read(address)?;
    print_records(&records, format)
}

/// Runs the latest-summary command.
pub fn latest_summary(
    store: &JsonlStore,
    unit: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;
    let record = store.read_latest_summary(unit)?;
    print_record(&record, format)
}

/// Runs the get command.
pub fn get(store: &JsonlStore, id: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;
    let record = store.get_by_id(id)?;
    print_record(&record, format)
}
