//! Artifact key layout and shared literals.
//!
//! Processed records live under `processed/` and daily summaries under
//! `daily-reports/`. Key generation is centralized here so the ingestion and
//! report stages agree on the layout.

use chrono::{DateTime, NaiveDate, Utc};

/// Namespace for per-file processed record artifacts.
pub const PROCESSED_PREFIX: &str = "processed/";

/// Namespace for daily summary artifacts.
pub const DAILY_REPORTS_PREFIX: &str = "daily-reports/";

/// Content type of every artifact the pipeline writes.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Fallback for missing strings in stored artifacts and storage metadata.
pub const UNKNOWN: &str = "unknown";

/// Event source of storage upload notifications.
pub const STORAGE_EVENT_SOURCE: &str = "aws:s3";

/// Object metadata key carrying the summarized date.
pub const REPORT_DATE_METADATA_KEY: &str = "report-date";

/// Object metadata key carrying the summary generation time.
pub const GENERATED_AT_METADATA_KEY: &str = "generated-at";

/// Message attached to a summary for a day without processed files.
pub const EMPTY_SUMMARY_MESSAGE: &str = "No files processed on this date";

/// Build the key of a processed record artifact:
/// `processed/{YYYYMMDD_HHMMSS}_{basename}_processed.json`.
pub fn processed_artifact_key(source_key: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}{}_{}_processed.json",
        PROCESSED_PREFIX,
        at.format("%Y%m%d_%H%M%S"),
        base_name(source_key)
    )
}

/// Build the key of a daily summary artifact: `daily-reports/{YYYY-MM-DD}_daily_summary.json`.
pub fn daily_summary_key(report_date: NaiveDate) -> String {
    format!(
        "{}{}_daily_summary.json",
        DAILY_REPORTS_PREFIX,
        report_date.format("%Y-%m-%d")
    )
}

/// Compact date form (`YYYYMMDD`) matched against processed artifact keys.
pub fn compact_date(report_date: NaiveDate) -> String {
    report_date.format("%Y%m%d").to_string()
}

/// Last path segment of a storage key.
pub fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_processed_artifact_key_uses_base_name() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 7).unwrap();
        assert_eq!(
            processed_artifact_key("uploads/2024/orders.csv", at),
            "processed/20240115_090507_orders.csv_processed.json"
        );
        assert_eq!(
            processed_artifact_key("orders.csv", at),
            "processed/20240115_090507_orders.csv_processed.json"
        );
    }

    #[test]
    fn test_daily_summary_key() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            daily_summary_key(date),
            "daily-reports/2024-01-15_daily_summary.json"
        );
        assert_eq!(compact_date(date), "20240115");
    }

    #[test]
    fn test_base_name_of_trailing_slash_is_empty() {
        assert_eq!(base_name("dir/"), "");
        assert_eq!(base_name("a/b/c.txt"), "c.txt");
    }
}
