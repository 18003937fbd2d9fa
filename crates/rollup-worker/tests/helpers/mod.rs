//! Test helpers: build handlers over an in-memory or local store.
//!
//! Run from workspace root: `cargo test -p rollup-worker --test pipeline_test`.

use std::sync::Arc;

use rollup_core::PipelineConfig;
use rollup_storage::{BlobStore, LocalBlobStore, MemoryBlobStore, ObjectMetadata};
use rollup_worker::{DailyReportHandler, IngestionHandler};
use serde_json::{json, Value};
use tempfile::TempDir;

pub const RAW_BUCKET: &str = "raw-data";
pub const REPORTS_BUCKET: &str = "reports";

/// Sample CSV with a header row and four data rows.
pub const ORDERS_CSV: &[u8] = b"order_id,amount\n1,10.50\n2,3.20\n3,7.00\n4,1.99\n";

/// Handlers sharing one store.
pub struct TestPipeline<S> {
    pub store: Arc<S>,
    pub ingestion: IngestionHandler,
    pub daily: DailyReportHandler,
}

impl<S: BlobStore + 'static> TestPipeline<S> {
    pub fn new(store: Arc<S>) -> Self {
        let config = PipelineConfig::new(REPORTS_BUCKET).with_raw_bucket(RAW_BUCKET);
        let shared: Arc<dyn BlobStore> = store.clone();
        Self {
            ingestion: IngestionHandler::new(shared.clone(), &config),
            daily: DailyReportHandler::new(shared, &config),
            store,
        }
    }

    pub async fn upload(&self, key: &str, body: &[u8], content_type: &str) {
        self.store
            .put(RAW_BUCKET, key, body.to_vec(), content_type, &ObjectMetadata::new())
            .await
            .expect("Failed to upload test object");
    }
}

pub fn memory_pipeline() -> TestPipeline<MemoryBlobStore> {
    TestPipeline::new(Arc::new(MemoryBlobStore::new()))
}

pub fn paged_memory_pipeline(page_size: usize) -> TestPipeline<MemoryBlobStore> {
    TestPipeline::new(Arc::new(MemoryBlobStore::new().with_page_size(page_size)))
}

/// Local pipeline plus the temp dir that owns its files.
pub async fn local_pipeline() -> (TestPipeline<LocalBlobStore>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let store = LocalBlobStore::new(temp_dir.path())
        .await
        .expect("Failed to create local store");
    (TestPipeline::new(Arc::new(store)), temp_dir)
}

/// Upload notification for `keys` in the raw bucket, keys URL-encoded.
pub fn upload_event(keys: &[&str]) -> Value {
    let records: Vec<Value> = keys
        .iter()
        .map(|key| {
            json!({
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": RAW_BUCKET },
                    "object": { "key": urlencoding::encode(key) }
                }
            })
        })
        .collect();
    json!({ "Records": records })
}
