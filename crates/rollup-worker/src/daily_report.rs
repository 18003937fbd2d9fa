//! Daily report stage: aggregate one day of processed records into a summary.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use rollup_core::constants::{
    compact_date, daily_summary_key, GENERATED_AT_METADATA_KEY, JSON_CONTENT_TYPE,
    PROCESSED_PREFIX, REPORT_DATE_METADATA_KEY,
};
use rollup_core::{
    DailySummary, PipelineConfig, PipelineError, PipelineResult, ProcessingResult,
};
use rollup_processing::aggregate;
use rollup_storage::{BlobStore, ObjectMetadata};
use serde::Serialize;
use serde_json::Value;

use crate::outcome::Outcome;

/// A persisted daily summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyReport {
    pub summary: DailySummary,
    pub report_key: String,
    pub report_location: String,
    /// Processed artifacts that could not be read or parsed.
    pub skipped_artifacts: usize,
}

/// Serialized body of a daily report outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyReportDetails {
    pub report_date: NaiveDate,
    pub report_location: String,
    pub total_files_processed: u64,
    pub total_records: u64,
    pub skipped_artifacts: usize,
}

impl From<&DailyReport> for DailyReportDetails {
    fn from(report: &DailyReport) -> Self {
        Self {
            report_date: report.summary.report_date,
            report_location: report.report_location.clone(),
            total_files_processed: report.summary.total_files,
            total_records: report.summary.total_records,
            skipped_artifacts: report.skipped_artifacts,
        }
    }
}

/// Pick the date to summarize from a trigger event.
///
/// `report_date` is read at the top level or under `detail`. Without one the
/// previous UTC day relative to `now` is used.
pub fn resolve_report_date(event: &Value, now: DateTime<Utc>) -> PipelineResult<NaiveDate> {
    let requested = event
        .get("report_date")
        .or_else(|| event.get("detail").and_then(|detail| detail.get("report_date")));

    match requested {
        None | Some(Value::Null) => now
            .date_naive()
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| PipelineError::InvalidEvent("no previous day".to_string())),
        Some(Value::String(raw)) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|e| {
                PipelineError::InvalidEvent(format!("invalid report_date {:?}: {}", raw, e))
            }),
        Some(other) => Err(PipelineError::InvalidEvent(format!(
            "report_date must be a YYYY-MM-DD string, got {}",
            other
        ))),
    }
}

pub struct DailyReportHandler {
    storage: Arc<dyn BlobStore>,
    reports_bucket: String,
}

impl DailyReportHandler {
    pub fn new(storage: Arc<dyn BlobStore>, config: &PipelineConfig) -> Self {
        Self {
            storage,
            reports_bucket: config.reports_bucket.clone(),
        }
    }

    /// Run one invocation from a raw trigger event.
    pub async fn invoke(&self, event: &Value) -> Outcome<DailyReportDetails> {
        let report_date = match resolve_report_date(event, Utc::now()) {
            Ok(date) => date,
            Err(e) => {
                tracing::error!(error = %e, "Rejected daily report trigger");
                return Outcome::failure("Error generating daily report", e, None);
            }
        };

        match self.handle(report_date).await {
            Ok(report) => Outcome::success(
                "Daily report generated successfully",
                DailyReportDetails::from(&report),
            ),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    report_date = %report_date,
                    retryable = e.is_recoverable(),
                    "Daily report failed"
                );
                Outcome::failure("Error generating daily report", e, None)
            }
        }
    }

    /// Collect, aggregate and persist the summary for `report_date`.
    pub async fn handle(&self, report_date: NaiveDate) -> PipelineResult<DailyReport> {
        tracing::info!(report_date = %report_date, "Generating daily report");

        let (results, skipped_artifacts) = self.collect(report_date).await?;
        let summary = aggregate(&results, report_date);
        if summary.is_empty() {
            tracing::warn!(
                report_date = %report_date,
                skipped_artifacts,
                "No processed records found for date"
            );
        }
        let report_key = daily_summary_key(report_date);

        let mut metadata = ObjectMetadata::new();
        metadata.insert(
            REPORT_DATE_METADATA_KEY.to_string(),
            report_date.format("%Y-%m-%d").to_string(),
        );
        metadata.insert(
            GENERATED_AT_METADATA_KEY.to_string(),
            rollup_core::timestamp::format(&summary.generated_at),
        );

        let body = serde_json::to_vec_pretty(&summary)?;
        self.storage
            .put(&self.reports_bucket, &report_key, body, JSON_CONTENT_TYPE, &metadata)
            .await?;

        let report_location = self.storage.uri(&self.reports_bucket, &report_key);
        tracing::info!(
            report_date = %report_date,
            location = %report_location,
            total_files = summary.total_files,
            total_records = summary.total_records,
            skipped_artifacts,
            "Daily report saved"
        );

        Ok(DailyReport {
            summary,
            report_key,
            report_location,
            skipped_artifacts,
        })
    }

    /// Read every processed record whose key carries `report_date`.
    ///
    /// Listing failures are fatal. Unreadable or unparseable artifacts are
    /// logged and counted in the second tuple element.
    pub async fn collect(
        &self,
        report_date: NaiveDate,
    ) -> PipelineResult<(Vec<ProcessingResult>, usize)> {
        let date_token = compact_date(report_date);
        let keys = self
            .storage
            .list_all(&self.reports_bucket, PROCESSED_PREFIX)
            .await?;

        let mut results = Vec::new();
        let mut skipped = 0usize;

        for key in keys.iter().filter(|key| key.contains(&date_token)) {
            let body = match self.storage.get(&self.reports_bucket, key).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Skipping unreadable artifact");
                    skipped += 1;
                    continue;
                }
            };

            match serde_json::from_slice::<ProcessingResult>(&body) {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Skipping malformed artifact");
                    skipped += 1;
                }
            }
        }

        tracing::info!(
            report_date = %report_date,
            listed = keys.len(),
            collected = results.len(),
            skipped,
            "Processed records collected"
        );

        Ok((results, skipped))
    }
}
