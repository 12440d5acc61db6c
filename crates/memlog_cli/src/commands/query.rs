//! Query command implementation.

use crate::output::{print_records, Format};
use memlog_core::{JsonlStore, Stream, TimeQuery};

/// Raw query arguments as given on the command line.
#[derive(Debug)]
pub struct QueryArgs {
    /// Window start.
    pub start: String,
    /// Window end.
    pub end: String,
    /// Unit to search.
    pub address: Option<String>,
    /// Stream name.
    pub stream: Option<String>,
    /// Maximum number of records.
    pub limit: Option<usize>,
}

impl QueryArgs {
    /// Builds the store query. Bounds are parsed by the store.
    pub fn to_query(&self) -> Result<TimeQuery, Box<dyn std::error::Error>> {
        let mut query = TimeQuery::new(self.start.as_str(), self.end.as_str());
        if let Some(address) = &self.address {
            query = query.address(address.as_str());
        }
        if let Some(stream) = &self.stream {
            query = query.stream(stream.parse::<Stream>()?);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        Ok(query)
    }
}

/// Runs the query command.
pub fn run(store: &JsonlStore, args: QueryArgs, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::parse(format)?;
    let records = store.query_by_time(&args.to_query()?)?;
    tracing::debug!(matches = records.len(), "query finished");
    print_records(&records, format)
}
