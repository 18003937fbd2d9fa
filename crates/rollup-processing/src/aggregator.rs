//! Daily summary aggregation.
//!
//! Averages and the megabyte total are rounded to two decimals, half away from
//! zero.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rollup_core::constants::{EMPTY_SUMMARY_MESSAGE, UNKNOWN};
use rollup_core::{DailySummary, FileDigest, ProcessingResult, ProcessingStatus};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Summarize a day's results, stamped with the current time.
pub fn aggregate(results: &[ProcessingResult], report_date: NaiveDate) -> DailySummary {
    aggregate_at(results, report_date, Utc::now())
}

/// Summarize a day's results with an explicit generation time.
pub fn aggregate_at(
    results: &[ProcessingResult],
    report_date: NaiveDate,
    generated_at: DateTime<Utc>,
) -> DailySummary {
    if results.is_empty() {
        return empty_summary(report_date, generated_at);
    }

    let total_files = results.len() as u64;
    let total_records = saturating_total(results.iter().map(|r| r.record_count));
    let total_size_bytes = saturating_total(results.iter().map(|r| r.file_size_bytes));

    let mut files_by_type: BTreeMap<String, u64> = BTreeMap::new();
    let mut processing_status: BTreeMap<String, u64> = BTreeMap::new();
    for result in results {
        *files_by_type.entry(result.content_type.clone()).or_default() += 1;
        *processing_status
            .entry(result.processing_status.as_str().to_string())
            .or_default() += 1;
    }

    let files_processed = results
        .iter()
        .map(|r| FileDigest {
            source_file: r.source_file.clone(),
            record_count: r.record_count,
            file_size_bytes: r.file_size_bytes,
            processed_at: r
                .processed_at
                .as_ref()
                .map(rollup_core::timestamp::format)
                .unwrap_or_else(|| UNKNOWN.to_string()),
        })
        .collect();

    let summary = DailySummary {
        report_date,
        generated_at,
        total_files,
        total_records,
        total_size_bytes,
        total_size_mb: round2(total_size_bytes as f64 / BYTES_PER_MB),
        files_by_type,
        processing_status,
        average_records_per_file: round2(total_records as f64 / total_files as f64),
        average_file_size_bytes: round2(total_size_bytes as f64 / total_files as f64),
        files_processed,
        message: None,
    };

    tracing::info!(
        report_date = %report_date,
        total_files = summary.total_files,
        total_records = summary.total_records,
        "Summary generated"
    );

    summary
}

fn empty_summary(report_date: NaiveDate, generated_at: DateTime<Utc>) -> DailySummary {
    let processing_status = [ProcessingStatus::Success, ProcessingStatus::Error]
        .iter()
        .map(|status| (status.as_str().to_string(), 0))
        .collect();

    DailySummary {
        report_date,
        generated_at,
        total_files: 0,
        total_records: 0,
        total_size_bytes: 0,
        total_size_mb: 0.0,
        files_by_type: BTreeMap::new(),
        processing_status,
        average_records_per_file: 0.0,
        average_file_size_bytes: 0.0,
        files_processed: Vec::new(),
        message: Some(EMPTY_SUMMARY_MESSAGE.to_string()),
    }
}

// Counts come from stored artifacts and are not bounded; totals clamp at u64::MAX.
fn saturating_total(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0u64, u64::saturating_add)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
