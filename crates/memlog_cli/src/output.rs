//! Record printing shared by the read-side commands.

use memlog_core::Record;

/// How records are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// One human-readable line per record.
    Text,
    /// One JSON object per line, as stored.
    Json,
}

impl Format {
    /// Parses a `--format` value.
    pub fn parse(value: &str) -> Result<Self, Box<dyn std::error::Error>> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format {other:?} (expected text or json)").into()),
        }
    }
}

/// Prints `records` in the given format.
pub fn print_records(records: &[Record], format: Format) -> Result<(), Box<dyn std::error::Error>> {
    for record in records {
        print_record(record, format)?;
    }
    Ok(())
}

/// Prints one record in the given format.
pub fn print_record(record: &Record, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        Format::Json => println!("{}", serde_json::to_string(record)?),
        Format::Text => println!("{}", text_line(record)),
    }
    Ok(())
}

fn text_line(record: &Record) -> String {
    let mut line = format!("{}  {}  {}", record.id, record.created_at, record.content.escape_debug());
    if let Some(sources) = &record.source_ids {
        line.push_str(&format!("  [sources: {}]", sources.join(", ")));
    }
    line
}
