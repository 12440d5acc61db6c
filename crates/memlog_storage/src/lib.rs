//! # memlog Storage
//!
//! Append-only line file primitives for memlog.
//!
//! This crate is the lowest layer of the engine. It treats log files as
//! **opaque newline-delimited byte streams** and never interprets the JSON
//! inside a line.
//!
//! ## Design Principles
//!
//! - Appends go through append-mode handles and report the exact byte span
//! - Range reads return exactly the bytes previously written at that span
//! - Scans report the byte offset of every physical line
//! - Whole-file rewrites are atomic (temp file, then rename)
//!
//! ## Example
//!
//! ```rust,no_run
//! use memlog_storage::{FileBackend, LineScanner};
//! use std::path::Path;
//!
//! let path = Path::new("events.jsonl");
//! let mut backend = FileBackend::open(path).unwrap();
//! let span = backend.append_line(b"{\"id\":\"a\"}").unwrap();
//!
//! for line in LineScanner::open(path).unwrap() {
//!     let line = line.unwrap();
//!     println!("{} +{}", line.offset, line.len());
//! }
//! # let _ = span;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod atomic;
mod error;
mod file;
mod lines;

pub use atomic::{sync_dir, AtomicFile};
pub use error::{StorageError, StorageResult};
pub use file::{FileBackend, LineSpan};
pub use lines::{Line, LineScanner};
