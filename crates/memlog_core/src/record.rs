//! Record model.
//!
//! On disk a record is one compact JSON object per line:
//!
//! ```text
//! {"id":"9f1c…","ts":"2024-05-01T10:00:00Z","t":1714557600,"content":"hello"}
//! {"id":"77ab…","ts":"2024-05-01T10:05:00Z","t":1714557900,"content":"S1","source_ids":["9f1c…"]}
//! ```

use crate::clock::Clock;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Timestamp format for the `ts` field.
const ISO_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// One immutable stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique record identifier (32 lower-case hex characters).
    pub id: String,

    /// ISO-8601 UTC creation time.
    #[serde(rename = "ts", default)]
    pub created_at: String,

    /// Creation time in epoch seconds. `None` if the stored value is
    /// missing or not an integer.
    #[serde(rename = "t", default, deserialize_with = "lenient_epoch")]
    pub created_at_epoch: Option<i64>,

    /// The stored text.
    pub content: String,

    /// Records a summary was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<String>>,
}

impl Record {
    /// Builds a new record stamped with a fresh id and the clock's time.
    #[must_use]
    pub fn new(content: impl Into<String>, clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            created_at: now.format(ISO_UTC_FORMAT).to_string(),
            created_at_epoch: Some(now.timestamp()),
            content: content.into(),
            source_ids: None,
        }
    }

    /// Attaches provenance ids. An empty list is not stored.
    #[must_use]
    pub fn with_source_ids(mut self, source_ids: &[String]) -> Self {
        self.source_ids = if source_ids.is_empty() {
            None
        } else {
            Some(source_ids.to_vec())
        };
        self
    }
}

/// Accepts any JSON value for an epoch field and keeps it only if it is an
/// integer.
pub(crate) fn lenient_epoch<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn new_record_is_stamped() {
        let clock = ManualClock::new(1_714_557_600);
        let record = Record::new("hello", &clock);

        assert_eq!(record.id.len(), 32);
        assert!(record.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(record.created_at, "2024-05-01T10:00:00Z");
        assert_eq!(record.created_at_epoch, Some(1_714_557_600));
        assert!(record.source_ids.is_none());
    }

    #[test]
    fn ids_are_unique() {
        let clock = ManualClock::new(0);
        let a = Record::new("x", &clock);
        let b = Record::new("x", &clock);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serializes_with_on_disk_names() {
        let clock = ManualClock::new(1_714_557_600);
        let record = Record::new("hi", &clock).with_source_ids(&["x".into(), "y".into()]);
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.starts_with(&format!("{{\"id\":\"{}\",\"ts\":", record.id)));
        assert!(json.contains("\"t\":1714557600"));
        assert!(json.contains("\"source_ids\":[\"x\",\"y\"]"));
        assert!(!json.contains('\n'));
    }

    #[test]
    fn empty_source_ids_are_omitted() {
        let clock = ManualClock::new(0);
        let record = Record::new("s", &clock).with_source_ids(&[]);
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("source_ids"));
    }

    #[test]
    fn non_integer_epoch_decodes_as_unknown() {
        let record: Record =
            serde_json::from_str(r#"{"id":"a","ts":"","t":"soon","content":"c"}"#).unwrap();
        assert_eq!(record.created_at_epoch, None);

        let record: Record = serde_json::from_str(r#"{"id":"a","content":"c"}"#).unwrap();
        assert_eq!(record.created_at_epoch, None);
        assert_eq!(record.created_at, "");
    }

    #[test]
    fn content_with_newlines_stays_on_one_line() {
        let clock = ManualClock::new(0);
        let record = Record::new("line1\nline2 \"quoted\" 中文", &clock);
        let json = serde_json::to_vec(&record).unwrap();
        assert!(!json.contains(&b'\n'));

        let back: Record = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, record);
    }
}
