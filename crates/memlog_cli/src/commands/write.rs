//! Write and summary command implementations.

use memlog_core::JsonlStore;
use serde_json::Value;

/// Runs the write command.
///
/// `json` takes precedence over `content` and must parse as a JSON value;
/// the store rejects anything but a string.
pub fn run(
    store: &JsonlStore,
    address: &str,
    content: Option<&str>,
    json: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = match (json, content) {
        (Some(raw), _) => {
            let value: Value = serde_json::from_str(raw)?;
            store.write_value(address, &value)?
        }
        (None, Some(text)) => store.write(address, text)?,
        (None, None) => return Err("content or --json required".into()),
    };

    println!("{}", record.id);
    Ok(())
}

/// Runs the summary command.
pub fn summary(
    store: &JsonlStore,
    unit: &str,
    text: &str,
    sources: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let sources: Vec<String> = sources
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let record = store.write_summary(unit, text, &sources)?;
    println!("{}", record.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memlog_core::{CoreError, Status};
    use tempfile::tempdir;

    #[test]
    fn json_content_must_be_a_string() {
        let root = tempdir().unwrap();
        let store = JsonlStore::open(root.path(), "book").unwrap();

        run(&store, "a", None, Some("\"text\"")).unwrap();
        assert_eq!(store.read("a").unwrap()[0].content, "text");

        let err = run(&store, "a", None, Some("[1, 2]")).unwrap_err();
        let core = err.downcast_ref::<CoreError>().unwrap();
        assert_eq!(core.status(), Status::InvalidParam);
    }

    #[test]
    fn summary_drops_blank_sources() {
        let root = tempdir().unwrap();
        let store = JsonlStore::open(root.path(), "book").unwrap();

        summary(&store, "a", "S", &["x".into(), " ".into(), "y ".into()]).unwrap();
        let latest = store.read_latest_summary("a").unwrap();
        assert_eq!(latest.source_ids, Some(vec!["x".to_string(), "y".to_string()]));
    }
}
