use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::UNKNOWN;

/// Outcome of processing one uploaded file.
///
/// Stored artifacts only ever carry `success` or `error`; any other value reads
/// back as `Unknown` so that the daily report can still count the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Success,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Success => "success",
            ProcessingStatus::Error => "error",
            ProcessingStatus::Unknown => UNKNOWN,
        }
    }
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Normalized record produced for every ingested file.
///
/// Fields missing from a stored artifact take their fallback values on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    #[serde(default = "unknown")]
    pub source_file: String,
    #[serde(default = "unknown")]
    pub source_bucket: String,
    #[serde(default, with = "crate::timestamp::option")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_size_bytes: u64,
    #[serde(default = "unknown")]
    pub content_type: String,
    #[serde(default)]
    pub record_count: u64,
    #[serde(default)]
    pub processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProcessingResult {
    /// Record of a file whose records were counted.
    pub fn success(
        source_bucket: impl Into<String>,
        source_file: impl Into<String>,
        file_size_bytes: u64,
        content_type: impl Into<String>,
        record_count: u64,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            source_bucket: source_bucket.into(),
            processed_at: Some(processed_at),
            file_size_bytes,
            content_type: content_type.into(),
            record_count,
            processing_status: ProcessingStatus::Success,
            error_message: None,
        }
    }

    /// Record of a file that could not be processed. The record count is zero.
    pub fn error(
        source_bucket: impl Into<String>,
        source_file: impl Into<String>,
        file_size_bytes: u64,
        content_type: impl Into<String>,
        error_message: impl Into<String>,
        processed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            source_bucket: source_bucket.into(),
            processed_at: Some(processed_at),
            file_size_bytes,
            content_type: content_type.into(),
            record_count: 0,
            processing_status: ProcessingStatus::Error,
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.processing_status == ProcessingStatus::Success
    }
}
