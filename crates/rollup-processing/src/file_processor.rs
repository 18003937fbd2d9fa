use std::sync::Arc;

use chrono::{DateTime, Utc};
use rollup_core::constants::UNKNOWN;
use rollup_core::ProcessingResult;
use rollup_storage::BlobStore;

use crate::record_counter::count_records;

/// Storage metadata of an uploaded file, with defaults when unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub size_bytes: u64,
    pub content_type: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

impl Default for FileMetadata {
    fn default() -> Self {
        Self {
            size_bytes: 0,
            content_type: UNKNOWN.to_string(),
            last_modified: None,
            etag: None,
        }
    }
}

/// Turns one uploaded object into a `ProcessingResult`.
pub struct FileProcessor {
    storage: Arc<dyn BlobStore>,
}

impl FileProcessor {
    pub fn new(storage: Arc<dyn BlobStore>) -> Self {
        Self { storage }
    }

    /// Fetch metadata. A failure is logged and replaced by defaults.
    pub async fn fetch_metadata(&self, bucket: &str, key: &str) -> FileMetadata {
        match self.storage.head(bucket, key).await {
            Ok(head) => FileMetadata {
                size_bytes: head.size,
                content_type: head.content_type.unwrap_or_else(|| UNKNOWN.to_string()),
                last_modified: head.last_modified,
                etag: head.etag,
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    "Metadata unavailable, using defaults"
                );
                FileMetadata::default()
            }
        }
    }

    /// Process one object.
    ///
    /// Never fails: a content fetch failure produces a result with status
    /// `error` so that the caller can still persist a record of it.
    pub async fn process(&self, bucket: &str, key: &str) -> ProcessingResult {
        let metadata = self.fetch_metadata(bucket, key).await;
        let start = std::time::Instant::now();

        let content = match self.storage.get(bucket, key).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    "Failed to fetch file content"
                );
                return ProcessingResult::error(
                    bucket,
                    key,
                    metadata.size_bytes,
                    metadata.content_type,
                    e.to_string(),
                    Utc::now(),
                );
            }
        };

        let record_count = count_records(&content, key);

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = metadata.size_bytes,
            content_type = %metadata.content_type,
            etag = ?metadata.etag,
            last_modified = ?metadata.last_modified,
            record_count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File processed"
        );

        ProcessingResult::success(
            bucket,
            key,
            metadata.size_bytes,
            metadata.content_type,
            record_count,
            Utc::now(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollup_core::ProcessingStatus;
    use rollup_storage::{MemoryBlobStore, MemoryOp, ObjectMetadata};

    async fn store_with(key: &str, content: &[u8], content_type: &str) -> Arc<MemoryBlobStore> {
        let store = Arc::new(MemoryBlobStore::new());
        store
            .put("raw", key, content.to_vec(), content_type, &ObjectMetadata::new())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_process_counts_csv_records() {
        let store = store_with("in/orders.csv", b"id,total\n1,5\n2,7\n3,1\n4,9\n", "text/csv").await;
        let processor = FileProcessor::new(store);

        let result = processor.process("raw", "in/orders.csv").await;

        assert_eq!(result.processing_status, ProcessingStatus::Success);
        assert_eq!(result.record_count, 4);
        assert_eq!(result.file_size_bytes, 25);
        assert_eq!(result.content_type, "text/csv");
        assert_eq!(result.source_bucket, "raw");
        assert_eq!(result.source_file, "in/orders.csv");
        assert!(result.processed_at.is_some());
        assert_eq!(result.error_message, None);
    }

    #[tokio::test]
    async fn test_missing_object_produces_error_result() {
        let processor = FileProcessor::new(Arc::new(MemoryBlobStore::new()));

        let result = processor.process("raw", "gone.csv").await;

        assert_eq!(result.processing_status, ProcessingStatus::Error);
        assert_eq!(result.record_count, 0);
        assert_eq!(result.file_size_bytes, 0);
        assert_eq!(result.content_type, "unknown");
        assert!(result
            .error_message
            .as_deref()
            .is_some_and(|msg| msg.contains("gone.csv")));
    }

    #[tokio::test]
    async fn test_metadata_failure_uses_defaults() {
        let store = store_with("a.txt", b"x\ny\n", "text/plain").await;
        store.fail_on(MemoryOp::Head, "raw", "");
        let processor = FileProcessor::new(store);

        let result = processor.process("raw", "a.txt").await;

        assert_eq!(result.processing_status, ProcessingStatus::Success);
        assert_eq!(result.record_count, 2);
        assert_eq!(result.file_size_bytes, 0);
        assert_eq!(result.content_type, "unknown");
    }

    #[tokio::test]
    async fn test_empty_content_type_reads_as_unknown() {
        let store = store_with("a.bin", b"\x00\x01", "").await;
        let processor = FileProcessor::new(store);

        let metadata = processor.fetch_metadata("raw", "a.bin").await;
        assert_eq!(metadata.content_type, "unknown");
        assert_eq!(metadata.size_bytes, 2);
    }
}
