use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-file line of a daily summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDigest {
    pub source_file: String,
    pub record_count: u64,
    pub file_size_bytes: u64,
    /// RFC 3339 timestamp, or `unknown` when the artifact carried none.
    pub processed_at: String,
}

/// Aggregate statistics over one day of processed records.
///
/// Maps are ordered so that identical input produces byte-identical artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub report_date: NaiveDate,
    #[serde(with = "crate::timestamp")]
    pub generated_at: DateTime<Utc>,
    pub total_files: u64,
    pub total_records: u64,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub files_by_type: BTreeMap<String, u64>,
    pub processing_status: BTreeMap<String, u64>,
    pub average_records_per_file: f64,
    pub average_file_size_bytes: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files_processed: Vec<FileDigest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DailySummary {
    pub fn is_empty(&self) -> bool {
        self.total_files == 0
    }
}
