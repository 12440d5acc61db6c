//! Per-unit and global index entries.
//!
//! Both index kinds are JSON-lines files written with the same discipline
//! as data files. A unit index entry locates a record inside its own
//! stream's data file; a global index entry additionally names the unit
//! and stream, so the whole book can be searched from one file.

use crate::address::{Stream, UnitAddress};
use crate::error::CoreResult;
use crate::record::lenient_epoch;
use memlog_storage::LineSpan;
use serde::{Deserialize, Serialize};

/// One line of a per-unit index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitIndexEntry {
    /// Record identifier.
    pub id: String,
    /// Record epoch seconds; `None` when unknown.
    #[serde(default, deserialize_with = "lenient_epoch")]
    pub t: Option<i64>,
    /// Byte offset of the record line in the data file.
    pub offset: u64,
    /// Byte length of the record line, newline included.
    pub len: u64,
}

impl UnitIndexEntry {
    /// Builds an entry for a record line.
    #[must_use]
    pub fn new(id: impl Into<String>, t: Option<i64>, span: LineSpan) -> Self {
        Self {
            id: id.into(),
            t,
            offset: span.offset,
            len: span.len,
        }
    }

    /// The byte span this entry points at.
    #[must_use]
    pub fn span(&self) -> LineSpan {
        LineSpan {
            offset: self.offset,
            len: self.len,
        }
    }

    /// The `(id, offset, len)` triple identifying this entry.
    #[must_use]
    pub fn key(&self) -> (&str, u64, u64) {
        (&self.id, self.offset, self.len)
    }
}

/// One line of the book-wide index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalIndexEntry {
    /// Record identifier.
    pub id: String,
    /// Record epoch seconds; `None` when unknown.
    #[serde(default, deserialize_with = "lenient_epoch")]
    pub t: Option<i64>,
    /// Unit address, without the summary marker.
    pub address: String,
    /// Stream holding the record.
    pub stream: Stream,
    /// Byte offset of the record line in the data file.
    pub offset: u64,
    /// Byte length of the record line, newline included.
    pub len: u64,
}

impl GlobalIndexEntry {
    /// Builds the global counterpart of a unit index entry.
    #[must_use]
    pub fn for_unit(unit: &UnitAddress, stream: Stream, entry: &UnitIndexEntry) -> Self {
        Self {
            id: entry.id.clone(),
            t: entry.t,
            address: unit.to_string(),
            stream,
            offset: entry.offset,
            len: entry.len,
        }
    }

    /// Resolves the entry to a validated location.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` if the stored address is not a valid unit
    /// address, which only happens if the index file was edited by hand.
    pub fn location(&self) -> CoreResult<Location> {
        Ok(Location {
            unit: UnitAddress::parse(&self.address)?,
            stream: self.stream,
            span: LineSpan {
                offset: self.offset,
                len: self.len,
            },
        })
    }
}

/// Where a record lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Unit holding the record.
    pub unit: UnitAddress,
    /// Stream holding the record.
    pub stream: Stream,
    /// Byte span of the record line in the stream's data file.
    pub span: LineSpan,
}
