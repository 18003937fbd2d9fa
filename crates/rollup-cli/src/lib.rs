//! Helpers shared by the `rollup` binary.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// Read an event document from a file, or from stdin when `source` is `-`.
pub fn read_event(source: &Path) -> anyhow::Result<Value> {
    let raw = if source == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Read event from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Read event file {}", source.display()))?
    };

    parse_event(&raw)
}

/// Parse an event document. Blank input is an empty object.
pub fn parse_event(raw: &str) -> anyhow::Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).context("Event is not valid JSON")
}

/// Put an explicit `--date` into a trigger event, overriding any `report_date` it holds.
pub fn with_report_date(mut event: Value, date: Option<NaiveDate>) -> Value {
    if let (Some(date), Some(object)) = (date, event.as_object_mut()) {
        object.insert(
            "report_date".to_string(),
            Value::String(date.format("%Y-%m-%d").to_string()),
        );
    }
    event
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize outcome")?;
    println!("{}", out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn parse_event_blank_is_empty_object() {
        assert_eq!(parse_event("  \n").unwrap(), json!({}));
    }

    #[test]
    fn parse_event_rejects_garbage() {
        assert!(parse_event("{\"Records\": [").is_err());
    }

    #[test]
    fn read_event_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"report_date\": \"2024-01-15\"}}").unwrap();

        let event = read_event(file.path()).unwrap();
        assert_eq!(event["report_date"], "2024-01-15");
    }

    #[test]
    fn read_event_missing_file_names_path() {
        let err = read_event(Path::new("/nonexistent/event.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/event.json"));
    }

    #[test]
    fn with_report_date_overrides_event() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29);
        let event = with_report_date(json!({ "report_date": "2024-01-01" }), date);
        assert_eq!(event["report_date"], "2024-02-29");

        let untouched = with_report_date(json!({ "detail": {} }), None);
        assert_eq!(untouched, json!({ "detail": {} }));
    }
}
