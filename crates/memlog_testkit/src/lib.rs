//! # memlog Testkit
//!
//! Test utilities for memlog.
//!
//! This crate provides:
//! - Throwaway stores driven by a manual clock
//! - Property-based test generators using proptest
//! - Stress testing utilities
//! - Crash reconciliation scenarios
//!
//! ## Usage
//!
//! ```rust
//! use memlog_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     let record = store.write("course/ch1", "hello").unwrap();
//!     assert_eq!(store.get_by_id(&record.id).unwrap(), record);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
