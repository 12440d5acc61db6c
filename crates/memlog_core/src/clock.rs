//! Wall-clock sources for record timestamps.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current UTC time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the current time as whole epoch seconds.
    fn epoch_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

/// The operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Used to write records at chosen epoch seconds.
#[derive(Debug)]
pub struct ManualClock {
    epoch: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `epoch` seconds.
    #[must_use]
    pub fn new(epoch: i64) -> Self {
        Self {
            epoch: AtomicI64::new(epoch),
        }
    }

    /// Moves the clock to `epoch` seconds.
    pub fn set(&self, epoch: i64) {
        self.epoch.store(epoch, Ordering::SeqCst);
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&self, seconds: i64) {
        self.epoch.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        Utc.timestamp_opt(epoch, 0).single().unwrap_or_default()
    }

    fn epoch_seconds(&self) -> i64 {
        self.epoch.load(Ordering::SeqCst)
    }
}
