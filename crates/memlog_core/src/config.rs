//! Store configuration.

use crate::clock::{Clock, SystemClock};
use std::sync::Arc;

/// What an index rebuild records for a data line whose epoch time is
/// missing or not an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingTimePolicy {
    /// Write the entry with an unknown time. It stays locatable by id but
    /// never matches a time-range query.
    #[default]
    Unknown,
    /// Stamp the entry with the wall-clock time of the rebuild.
    Now,
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the book directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync every append to durable storage (safer but slower).
    pub sync_on_append: bool,

    /// How rebuilds treat records without a usable epoch time.
    pub missing_time: MissingTimePolicy,

    /// Time source for new records.
    pub clock: Arc<dyn Clock>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_append: false,
            missing_time: MissingTimePolicy::Unknown,
            clock: Arc::new(SystemClock),
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the book directory if missing.
    #[must_use]
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync every append.
    #[must_use]
    pub fn sync_on_append(mut self, value: bool) -> Self {
        self.sync_on_append = value;
        self
    }

    /// Sets the rebuild policy for records without a usable time.
    #[must_use]
    pub fn missing_time(mut self, policy: MissingTimePolicy) -> Self {
        self.missing_time = policy;
        self
    }

    /// Sets the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
