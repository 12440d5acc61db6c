//! Address parsing and validation.
//!
//! An address is a slash-separated path of segments made of
//! `[A-Za-z0-9_-]`. It names a *unit*; a trailing [`SUMMARY_MARKER`]
//! segment selects that unit's summary stream instead of its events:
//!
//! ```text
//! course/ch1/sec2              -> unit "course/ch1/sec2", events
//! course/ch1/sec2/__summary__  -> unit "course/ch1/sec2", summary
//! ```
//!
//! Parsing is purely lexical. Confirming that a unit resolves inside the
//! book directory is done by [`crate::layout::BookDir`].

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Reserved terminal segment selecting the summary stream.
pub const SUMMARY_MARKER: &str = "__summary__";

/// One of the two logs kept per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Raw appended records.
    Events,
    /// Derived, condensed records.
    Summary,
}

impl Stream {
    /// Both streams, in layout order.
    pub const ALL: [Stream; 2] = [Stream::Events, Stream::Summary];

    /// Lower-case stream name as stored in the global index.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Stream::Events => "events",
            Stream::Summary => "summary",
        }
    }

    /// File name of this stream's data log inside a unit directory.
    #[must_use]
    pub const fn data_file_name(self) -> &'static str {
        match self {
            Stream::Events => "events.jsonl",
            Stream::Summary => "summary.jsonl",
        }
    }

    /// File name of this stream's unit index inside a unit directory.
    #[must_use]
    pub const fn index_file_name(self) -> &'static str {
        match self {
            Stream::Events => "events.index.jsonl",
            Stream::Summary => "summary.index.jsonl",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stream {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "events" => Ok(Stream::Events),
            "summary" => Ok(Stream::Summary),
            other => Err(CoreError::invalid_param(format!(
                "unknown stream {other:?}, expected \"events\" or \"summary\""
            ))),
        }
    }
}

/// A validated unit address, normalized without leading or trailing slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitAddress(String);

impl UnitAddress {
    /// Validates a unit address.
    ///
    /// The summary marker is not allowed anywhere in a unit address.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAddress`] if the address is empty, has an
    /// empty, `.` or `..` segment, contains a character outside
    /// `[A-Za-z0-9_-]` or contains the summary marker.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let normalized = normalize(raw);
        let segments = split_segments(raw, normalized)?;
        if segments.iter().any(|s| *s == SUMMARY_MARKER) {
            return Err(CoreError::invalid_address(
                raw,
                format!("`{SUMMARY_MARKER}` is reserved for the summary stream"),
            ));
        }
        Ok(Self(normalized.to_string()))
    }

    /// The normalized address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the address segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// The address as a relative file-system path.
    #[must_use]
    pub fn to_relative_path(&self) -> PathBuf {
        self.segments().collect()
    }
}

impl fmt::Display for UnitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for UnitAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for UnitAddress {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A unit address together with the stream it selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamAddress {
    /// The unit the stream belongs to.
    pub unit: UnitAddress,
    /// The selected stream.
    pub stream: Stream,
}

impl StreamAddress {
    /// Parses a caller-supplied address into unit and stream.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidAddress`] for any address a
    /// [`UnitAddress`] would reject, for a bare summary marker, and for a
    /// summary marker that is not the last segment.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let normalized = normalize(raw);
        let segments = split_segments(raw, normalized)?;

        let (unit_segments, stream) = match segments.split_last() {
            Some((last, rest)) if *last == SUMMARY_MARKER => {
                if rest.is_empty() {
                    return Err(CoreError::invalid_address(
                        raw,
                        "summary must belong to a unit address",
                    ));
                }
                (rest, Stream::Summary)
            }
            _ => (segments.as_slice(), Stream::Events),
        };

        if unit_segments.iter().any(|s| *s == SUMMARY_MARKER) {
            return Err(CoreError::invalid_address(
                raw,
                format!("`{SUMMARY_MARKER}` may only appear as the last segment"),
            ));
        }

        Ok(Self {
            unit: UnitAddress(unit_segments.join("/")),
            stream,
        })
    }

    /// Builds a stream address from its parts.
    #[must_use]
    pub fn new(unit: UnitAddress, stream: Stream) -> Self {
        Self { unit, stream }
    }
}

impl fmt::Display for StreamAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stream {
            Stream::Events => write!(f, "{}", self.unit),
            Stream::Summary => write!(f, "{}/{SUMMARY_MARKER}", self.unit),
        }
    }
}

/// Validates a single path segment such as a book identifier.
///
/// # Errors
///
/// Returns [`CoreError::InvalidAddress`] if the segment is empty or contains
/// a character outside `[A-Za-z0-9_-]`.
pub fn validate_segment(segment: &str) -> CoreResult<&str> {
    match check_segment(segment) {
        Some(reason) => Err(CoreError::invalid_address(segment, reason)),
        None => Ok(segment),
    }
}

fn normalize(raw: &str) -> &str {
    raw.trim().trim_matches('/')
}

fn split_segments<'a>(raw: &str, normalized: &'a str) -> CoreResult<Vec<&'a str>> {
    if normalized.is_empty() {
        return Err(CoreError::invalid_address(raw, "address is empty"));
    }

    let segments: Vec<&str> = normalized.split('/').collect();
    for segment in &segments {
        if let Some(reason) = check_segment(segment) {
            return Err(CoreError::invalid_address(raw, reason));
        }
    }
    Ok(segments)
}

fn check_segment(segment: &str) -> Option<String> {
    match segment {
        "" => Some("empty segment".to_string()),
        "." | ".." => Some(format!("segment `{segment}` is not allowed")),
        _ => segment
            .chars()
            .find(|c| !is_segment_char(*c))
            .map(|c| format!("character {c:?} is not allowed")),
    }
}

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Status;
    use proptest::prelude::*;

    #[test]
    fn plain_address_selects_events() {
        let parsed = StreamAddress::parse("a/b/c").unwrap();
        assert_eq!(parsed.unit.as_str(), "a/b/c");
        assert_eq!(parsed.stream, Stream::Events);
    }

    #[test]
    fn marker_selects_summary() {
        let parsed = StreamAddress::parse("a/b/c/__summary__").unwrap();
        assert_eq!(parsed.unit.as_str(), "a/b/c");
        assert_eq!(parsed.stream, Stream::Summary);
        assert_eq!(parsed.to_string(), "a/b/c/__summary__");
    }

    #[test]
    fn slashes_and_whitespace_are_stripped() {
        let parsed = StreamAddress::parse("  /course/ch-1/sec_2// ").unwrap();
        assert_eq!(parsed.unit.as_str(), "course/ch-1/sec_2");
    }

    #[test]
    fn rejects_traversal_and_bad_segments() {
        for raw in [
            "",
            "/",
            "   ",
            "a/../b",
            "..",
            "a/./b",
            "a//b",
            "a/b c",
            "a/b.txt",
            "a\\b",
            "a/%2e%2e",
            "ü/x",
        ] {
            let err = StreamAddress::parse(raw).unwrap_err();
            assert_eq!(err.status(), Status::InvalidAddress, "{raw:?} accepted");
        }
    }

    #[test]
    fn bare_marker_is_rejected() {
        assert!(StreamAddress::parse("__summary__").is_err());
        assert!(StreamAddress::parse("/__summary__/").is_err());
    }

    #[test]
    fn marker_in_the_middle_is_rejected() {
        assert!(StreamAddress::parse("a/__summary__/b").is_err());
        assert!(UnitAddress::parse("a/__summary__").is_err());
    }

    #[test]
    fn unit_address_relative_path() {
        let unit = UnitAddress::parse("a/b/c").unwrap();
        assert_eq!(unit.to_relative_path(), PathBuf::from("a").join("b").join("c"));
        assert_eq!(unit.segments().count(), 3);
    }

    #[test]
    fn stream_names() {
        assert_eq!("events".parse::<Stream>().unwrap(), Stream::Events);
        assert_eq!("summary".parse::<Stream>().unwrap(), Stream::Summary);
        assert_eq!(
            "summaries".parse::<Stream>().unwrap_err().status(),
            Status::InvalidParam
        );
        assert_eq!(Stream::Summary.index_file_name(), "summary.index.jsonl");
    }

    #[test]
    fn segment_validation() {
        assert!(validate_segment("book-1").is_ok());
        assert!(validate_segment("").is_err());
        assert!(validate_segment("a/b").is_err());
    }

    proptest! {
        #[test]
        fn valid_segments_round_trip(segments in proptest::collection::vec("[A-Za-z0-9_-]{1,8}", 1..5)) {
            prop_assume!(segments.iter().all(|s| s != SUMMARY_MARKER));
            let raw = segments.join("/");
            let parsed = StreamAddress::parse(&raw).unwrap();
            prop_assert_eq!(parsed.unit.as_str(), raw.as_str());
            prop_assert_eq!(parsed.stream, Stream::Events);
        }

        #[test]
        fn never_accepts_dot_dot(prefix in "[a-z]{0,4}", suffix in "[a-z]{0,4}") {
            let raw = format!("{prefix}/../{suffix}");
            prop_assert!(StreamAddress::parse(&raw).is_err());
        }
    }
}
