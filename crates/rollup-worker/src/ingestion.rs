//! Ingestion stage: one processed record per uploaded file.

use std::sync::Arc;

use chrono::Utc;
use rollup_core::constants::{processed_artifact_key, JSON_CONTENT_TYPE};
use rollup_core::{PipelineConfig, PipelineResult, ProcessingResult, ProcessingStatus};
use rollup_processing::FileProcessor;
use rollup_storage::{BlobStore, ObjectMetadata};
use serde::Serialize;
use serde_json::Value;

use crate::events::{parse_upload_event, EventRecord};
use crate::outcome::Outcome;

/// What happened to one record of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum ItemResult {
    Persisted {
        bucket: String,
        key: String,
        artifact_key: String,
        processing_status: ProcessingStatus,
        record_count: u64,
    },
    Skipped {
        reason: String,
    },
    Failed {
        bucket: String,
        key: String,
        error: String,
        /// Whether redelivering the notification could succeed.
        retryable: bool,
    },
}

/// Per-item results of one batch, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestionReport {
    pub items: Vec<ItemResult>,
}

impl IngestionReport {
    pub fn processed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ItemResult::Persisted { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ItemResult::Skipped { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, ItemResult::Failed { .. }))
            .count()
    }

    pub fn artifacts(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| match item {
                ItemResult::Persisted { artifact_key, .. } => Some(artifact_key.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Serialized body of an ingestion outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionDetails {
    pub processed_files: usize,
    pub skipped_files: usize,
    pub failed_files: usize,
    pub artifacts: Vec<String>,
    pub items: Vec<ItemResult>,
}

impl From<IngestionReport> for IngestionDetails {
    fn from(report: IngestionReport) -> Self {
        Self {
            processed_files: report.processed(),
            skipped_files: report.skipped(),
            failed_files: report.failed(),
            artifacts: report.artifacts(),
            items: report.items,
        }
    }
}

/// Processes upload notifications and persists a processed record for each.
pub struct IngestionHandler {
    processor: FileProcessor,
    storage: Arc<dyn BlobStore>,
    reports_bucket: String,
}

impl IngestionHandler {
    pub fn new(storage: Arc<dyn BlobStore>, config: &PipelineConfig) -> Self {
        Self {
            processor: FileProcessor::new(storage.clone()),
            storage,
            reports_bucket: config.reports_bucket.clone(),
        }
    }

    /// Run one invocation from a raw event document.
    pub async fn invoke(&self, event: &Value) -> Outcome<IngestionDetails> {
        let records = match parse_upload_event(event) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, event = %event, "Rejected upload event");
                return Outcome::failure("Error processing file", e, None);
            }
        };

        let mut report = IngestionReport::default();
        for record in records {
            let item = match record {
                Ok(record) => self.handle_record(&record).await,
                Err(reason) => {
                    tracing::warn!(reason = %reason, "Skipping malformed record");
                    ItemResult::Skipped { reason }
                }
            };
            report.items.push(item);
        }

        Self::outcome(report)
    }

    /// Process records strictly in order. A failed item does not stop the batch.
    pub async fn handle(&self, records: &[EventRecord]) -> IngestionReport {
        let mut report = IngestionReport::default();
        for record in records {
            report.items.push(self.handle_record(record).await);
        }
        report
    }

    pub async fn handle_record(&self, record: &EventRecord) -> ItemResult {
        if !record.is_storage_event() {
            let source = record.event_source.as_deref().unwrap_or("<missing>");
            tracing::info!(event_source = %source, "Skipping non-storage event");
            return ItemResult::Skipped {
                reason: format!("unsupported event source: {}", source),
            };
        }

        let (Some(bucket), Some(key)) = (record.bucket(), record.key()) else {
            tracing::warn!("Skipping storage record without bucket or key");
            return ItemResult::Skipped {
                reason: "storage record without bucket or key".to_string(),
            };
        };

        self.ingest(bucket, &key).await
    }

    /// Process one object and persist its processed record.
    pub async fn ingest(&self, bucket: &str, key: &str) -> ItemResult {
        tracing::info!(bucket = %bucket, key = %key, "Processing file");
        let result = self.processor.process(bucket, key).await;

        match self.persist(&result).await {
            Ok(artifact_key) => ItemResult::Persisted {
                bucket: bucket.to_string(),
                key: key.to_string(),
                artifact_key,
                processing_status: result.processing_status,
                record_count: result.record_count,
            },
            Err(e) => {
                let retryable = e.is_recoverable();
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    retryable,
                    "Failed to persist processed record"
                );
                ItemResult::Failed {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    error: e.to_string(),
                    retryable,
                }
            }
        }
    }

    /// Write a processed record to the reports bucket and return its key.
    pub async fn persist(&self, result: &ProcessingResult) -> PipelineResult<String> {
        let artifact_key = processed_artifact_key(&result.source_file, Utc::now());
        let body = serde_json::to_vec_pretty(result)?;

        self.storage
            .put(
                &self.reports_bucket,
                &artifact_key,
                body,
                JSON_CONTENT_TYPE,
                &ObjectMetadata::new(),
            )
            .await?;

        tracing::info!(
            bucket = %self.reports_bucket,
            key = %artifact_key,
            "Processed record saved"
        );

        Ok(artifact_key)
    }

    fn outcome(report: IngestionReport) -> Outcome<IngestionDetails> {
        let failed = report.failed();
        let total = report.items.len();
        let details = IngestionDetails::from(report);

        if failed == 0 {
            Outcome::success("File processed successfully", details)
        } else {
            Outcome::failure(
                "Error processing file",
                format!("{} of {} notifications failed", failed, total),
                Some(details),
            )
        }
    }

    /// Convert a report built by [`handle`](Self::handle) into an outcome.
    pub fn into_outcome(report: IngestionReport) -> Outcome<IngestionDetails> {
        Self::outcome(report)
    }
}
