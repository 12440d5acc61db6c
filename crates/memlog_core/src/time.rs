//! Normalization of time-range bounds to epoch seconds.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// One end of a time window.
///
/// Naive calendar values are interpreted as UTC.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeBound {
    /// Whole epoch seconds.
    Epoch(i64),
    /// Fractional epoch seconds, truncated toward zero.
    Fractional(f64),
    /// A textual timestamp, parsed on normalization.
    Text(String),
    /// A timestamp with a known offset.
    Zoned(DateTime<FixedOffset>),
    /// A calendar timestamp without offset.
    Naive(NaiveDateTime),
}

impl TimeBound {
    /// Converts the bound to whole epoch seconds.
    ///
    /// Text is accepted as an integer or decimal epoch, an ISO-8601 /
    /// RFC 3339 timestamp with `Z` or a numeric offset, a naive timestamp
    /// (`T` or space separated, seconds and fraction optional), or a bare
    /// `YYYY-MM-DD` date meaning midnight UTC.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidParam`] if the text cannot be parsed or a
    /// fractional value is not finite.
    pub fn to_epoch_seconds(&self) -> CoreResult<i64> {
        match self {
            Self::Epoch(secs) => Ok(*secs),
            Self::Fractional(secs) => fractional_to_epoch(*secs),
            Self::Text(text) => parse_text(text),
            Self::Zoned(dt) => Ok(dt.timestamp()),
            Self::Naive(dt) => Ok(dt.and_utc().timestamp()),
        }
    }
}

fn fractional_to_epoch(secs: f64) -> CoreResult<i64> {
    if !secs.is_finite() || secs.abs() >= i64::MAX as f64 {
        return Err(CoreError::invalid_param(format!(
            "time bound {secs} is not a usable epoch"
        )));
    }
    Ok(secs.trunc() as i64)
}

fn parse_text(raw: &str) -> CoreResult<i64> {
    let text = raw.trim();

    if let Ok(secs) = text.parse::<i64>() {
        return Ok(secs);
    }
    if let Ok(secs) = text.parse::<f64>() {
        return fractional_to_epoch(secs);
    }

    let zoned = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        Some(rest) => format!("{rest}+00:00"),
        None => text.to_string(),
    };

    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&zoned, format) {
            return Ok(dt.timestamp());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp());
        }
    }

    Err(CoreError::invalid_param(format!(
        "unrecognized timestamp {raw:?}"
    )))
}

impl From<i64> for TimeBound {
    fn from(secs: i64) -> Self {
        Self::Epoch(secs)
    }
}

impl From<i32> for TimeBound {
    fn from(secs: i32) -> Self {
        Self::Epoch(i64::from(secs))
    }
}

impl From<u32> for TimeBound {
    fn from(secs: u32) -> Self {
        Self::Epoch(i64::from(secs))
    }
}

impl From<f64> for TimeBound {
    fn from(secs: f64) -> Self {
        Self::Fractional(secs)
    }
}

impl From<&str> for TimeBound {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TimeBound {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for TimeBound {
    fn from(dt: DateTime<Tz>) -> Self {
        Self::Zoned(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for TimeBound {
    fn from(dt: NaiveDateTime) -> Self {
        Self::Naive(dt)
    }
}

impl From<NaiveDate> for TimeBound {
    fn from(date: NaiveDate) -> Self {
        Self::Naive(date.and_time(chrono::NaiveTime::MIN))
    }
}
