//! CLI command implementations.

pub mod query;
pub mod read;
pub mod rebuild;
pub mod units;
pub mod verify;
pub mod write;
