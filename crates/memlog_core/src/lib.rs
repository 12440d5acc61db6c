//! # memlog Core
//!
//! Append-only, per-unit JSON-lines memory store.
//!
//! A *book* is a directory of *units* addressed by slash-separated paths.
//! Every unit keeps two streams, `events` and `summary`, each an
//! append-only data file plus an offset/length index. A book-wide index
//! makes records findable by id and by time.
//!
//! This crate provides:
//! - Address validation ([`StreamAddress`], [`UnitAddress`])
//! - The record model ([`Record`])
//! - Per-unit and global index maintenance
//! - A lazily hydrated id cache
//! - Index rebuild and verification
//! - The store façade ([`JsonlStore`]) and capability traits
//!   ([`Memory`], [`EnhancedMemory`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use memlog_core::{JsonlStore, Status};
//! use std::path::Path;
//!
//! let store = JsonlStore::open(Path::new("memory"), "course-101")?;
//! store.write("ch1/sec2", "hello")?;
//! store.write_summary("ch1/sec2", "greeting", &[])?;
//!
//! let result = store.read("ch1/missing");
//! assert_eq!(Status::of(&result), Status::NotFound);
//! # Ok::<(), memlog_core::CoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod address;
mod cache;
mod clock;
mod config;
mod error;
mod index;
mod journal;
mod layout;
mod memory;
mod query;
mod rebuild;
mod record;
mod store;
mod time;

pub use address::{validate_segment, Stream, StreamAddress, UnitAddress, SUMMARY_MARKER};
pub use cache::IdCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, MissingTimePolicy};
pub use error::{CoreError, CoreResult, Status};
pub use index::{GlobalIndexEntry, Location, UnitIndexEntry};
pub use layout::{BookDir, GLOBAL_INDEX_FILE};
pub use memory::{open_memory, EnhancedMemory, Memory};
pub use query::{ResolvedQuery, Scope, TimeQuery};
pub use rebuild::IndexState;
pub use record::Record;
pub use store::JsonlStore;
pub use time::TimeBound;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
