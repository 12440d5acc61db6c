//! Time-range query parameters.

use crate::address::{Stream, StreamAddress};
use crate::error::{CoreError, CoreResult};
use crate::time::TimeBound;

/// A time-window query over one stream or the whole book.
///
/// Without an address the global index is scanned and `stream` is an
/// optional filter. With an address, that unit's index for the selected
/// stream is scanned; the stream defaults to the one the address names.
///
/// # Example
///
/// ```
/// use memlog_core::{Stream, TimeQuery};
///
/// let query = TimeQuery::new("2024-05-01", "2024-05-02T00:00:00Z")
///     .address("course/ch1")
///     .stream(Stream::Summary)
///     .limit(10);
/// # let _ = query;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TimeQuery {
    /// One end of the window.
    pub start: TimeBound,
    /// The other end of the window.
    pub end: TimeBound,
    /// Unit to search instead of the whole book.
    pub address: Option<String>,
    /// Stream to search or filter by.
    pub stream: Option<Stream>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
}

impl TimeQuery {
    /// Creates a book-wide query for the inclusive window between `start`
    /// and `end`, in either order.
    pub fn new(start: impl Into<TimeBound>, end: impl Into<TimeBound>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            address: None,
            stream: None,
            limit: None,
        }
    }

    /// Restricts the query to one unit.
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Selects or filters by stream.
    #[must_use]
    pub fn stream(mut self, stream: Stream) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Caps the number of returned records.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validates and normalizes the query.
    ///
    /// # Errors
    ///
    /// - `InvalidParam` for an unparseable bound, a zero limit, or a stream
    ///   that contradicts the one named by the address
    /// - `InvalidAddress` for an invalid address
    pub fn resolve(&self) -> CoreResult<ResolvedQuery> {
        let mut from = self.start.to_epoch_seconds()?;
        let mut to = self.end.to_epoch_seconds()?;
        if to < from {
            std::mem::swap(&mut from, &mut to);
        }

        if self.limit == Some(0) {
            return Err(CoreError::invalid_param("limit must be positive"));
        }

        let scope = match &self.address {
            None => Scope::Book {
                stream: self.stream,
            },
            Some(raw) => {
                let parsed = StreamAddress::parse(raw)?;
                let stream = match self.stream {
                    None => parsed.stream,
                    Some(explicit) if explicit == parsed.stream || parsed.stream == Stream::Events => {
                        explicit
                    }
                    Some(explicit) => {
                        return Err(CoreError::invalid_param(format!(
                            "address {raw:?} selects the {} stream but {explicit} was requested",
                            parsed.stream
                        )))
                    }
                };
                Scope::Unit(StreamAddress::new(parsed.unit, stream))
            }
        };

        Ok(ResolvedQuery {
            from,
            to,
            scope,
            limit: self.limit,
        })
    }
}

/// Which index a query scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The global index, optionally filtered by stream.
    Book {
        /// Stream filter.
        stream: Option<Stream>,
    },
    /// One unit index.
    Unit(StreamAddress),
}

/// A validated [`TimeQuery`] with bounds in epoch seconds, `from <= to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    /// Inclusive lower bound.
    pub from: i64,
    /// Inclusive upper bound.
    pub to: i64,
    /// Index to scan.
    pub scope: Scope,
    /// Maximum number of records, if any.
    pub limit: Option<usize>,
}

impl ResolvedQuery {
    /// Returns true if an entry with time `t` falls in the window.
    /// Entries with unknown time never match.
    #[must_use]
    pub fn matches(&self, t: Option<i64>) -> bool {
        t.is_some_and(|t| self.from <= t && t <= self.to)
    }

    /// Returns true once `found` records satisfy the limit.
    #[must_use]
    pub fn is_full(&self, found: usize) -> bool {
        self.limit.is_some_and(|limit| found >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;

    #[test]
    fn bounds_are_swapped() {
        let resolved = TimeQuery::new(20, 10).resolve().unwrap();
        assert_eq!((resolved.from, resolved.to), (10, 20));
        assert!(resolved.matches(Some(10)));
        assert!(resolved.matches(Some(20)));
        assert!(!resolved.matches(Some(21)));
        assert!(!resolved.matches(None));
    }

    #[test]
    fn zero_limit_is_invalid() {
        let err = TimeQuery::new(0, 1).limit(0).resolve().unwrap_err();
        assert_eq!(err.status(), Status::InvalidParam);

        let resolved = TimeQuery::new(0, 1).limit(2).resolve().unwrap();
        assert!(!resolved.is_full(1));
        assert!(resolved.is_full(2));
    }

    #[test]
    fn bad_bound_is_invalid() {
        let err = TimeQuery::new("nonsense", 1).resolve().unwrap_err();
        assert_eq!(err.status(), Status::InvalidParam);
    }

    #[test]
    fn scope_defaults() {
        let book = TimeQuery::new(0, 1).resolve().unwrap();
        assert_eq!(book.scope, Scope::Book { stream: None });

        let unit = TimeQuery::new(0, 1).address("a/b").resolve().unwrap();
        match unit.scope {
            Scope::Unit(target) => {
                assert_eq!(target.unit.as_str(), "a/b");
                assert_eq!(target.stream, Stream::Events);
            }
            Scope::Book { .. } => panic!("expected unit scope"),
        }
    }

    #[test]
    fn stream_from_address_or_explicit() {
        let marker = TimeQuery::new(0, 1).address("a/__summary__").resolve().unwrap();
        assert!(matches!(marker.scope, Scope::Unit(ref t) if t.stream == Stream::Summary));

        let explicit = TimeQuery::new(0, 1)
            .address("a")
            .stream(Stream::Summary)
            .resolve()
            .unwrap();
        assert!(matches!(explicit.scope, Scope::Unit(ref t) if t.stream == Stream::Summary));

        let conflict = TimeQuery::new(0, 1)
            .address("a/__summary__")
            .stream(Stream::Events)
            .resolve()
            .unwrap_err();
        assert_eq!(conflict.status(), Status::InvalidParam);
    }

    #[test]
    fn invalid_address_is_reported() {
        let err = TimeQuery::new(0, 1).address("../x").resolve().unwrap_err();
        assert_eq!(err.status(), Status::InvalidAddress);
    }
}
