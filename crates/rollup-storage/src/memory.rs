//! In-memory blob store for tests and dry runs.
//!
//! Objects keep their content type and user metadata. Failures can be injected
//! per operation and key prefix to exercise error paths.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::keys::{paginate, validate_bucket, validate_key};
use crate::traits::{BlobStore, ListPage, ObjectHead, ObjectMetadata, StorageError, StorageResult};
use crate::StorageBackend;

const DEFAULT_PAGE_SIZE: usize = 1000;

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOp {
    Head,
    Get,
    Put,
    List,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
    metadata: ObjectMetadata,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
enum KeyMatch {
    Prefix(String),
    Contains(String),
}

impl KeyMatch {
    fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatch::Prefix(prefix) => key.starts_with(prefix.as_str()),
            KeyMatch::Contains(needle) => key.contains(needle.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    op: MemoryOp,
    bucket: String,
    keys: KeyMatch,
}

/// Mutex-guarded map of `bucket -> key -> object`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, StoredObject>>>,
    failures: Mutex<Vec<InjectedFailure>>,
    page_size: Option<usize>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of keys per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Make `op` fail for every key in `bucket` starting with `prefix`.
    pub fn fail_on(&self, op: MemoryOp, bucket: &str, prefix: &str) {
        self.inject(op, bucket, KeyMatch::Prefix(prefix.to_string()));
    }

    /// Make `op` fail for every key in `bucket` containing `needle`.
    pub fn fail_on_match(&self, op: MemoryOp, bucket: &str, needle: &str) {
        self.inject(op, bucket, KeyMatch::Contains(needle.to_string()));
    }

    fn inject(&self, op: MemoryOp, bucket: &str, keys: KeyMatch) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(InjectedFailure {
                op,
                bucket: bucket.to_string(),
                keys,
            });
        }
    }

    /// Stored user metadata of an object, if it exists.
    pub fn metadata(&self, bucket: &str, key: &str) -> Option<ObjectMetadata> {
        self.object(bucket, key).map(|object| object.metadata)
    }

    /// Number of objects in a bucket.
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .map(|buckets| buckets.get(bucket).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }

    fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let buckets = self.buckets.lock().ok()?;
        buckets.get(bucket)?.get(key).cloned()
    }

    fn check_failure(&self, op: MemoryOp, bucket: &str, key: &str) -> StorageResult<()> {
        let failures = self
            .failures
            .lock()
            .map_err(|_| StorageError::BackendError("memory store lock poisoned".to_string()))?;

        let injected = failures
            .iter()
            .any(|f| f.op == op && f.bucket == bucket && f.keys.matches(key));
        if !injected {
            return Ok(());
        }

        let message = format!("injected {:?} failure for {}/{}", op, bucket, key);
        Err(match op {
            MemoryOp::Head => StorageError::BackendError(message),
            MemoryOp::Get => StorageError::DownloadFailed(message),
            MemoryOp::Put => StorageError::UploadFailed(message),
            MemoryOp::List => StorageError::ListFailed(message),
        })
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectHead> {
        self.check_failure(MemoryOp::Head, bucket, key)?;
        let object = self
            .object(bucket, key)
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))?;

        Ok(ObjectHead {
            size: object.data.len() as u64,
            content_type: Some(object.content_type).filter(|ct| !ct.is_empty()),
            last_modified: Some(object.last_modified),
            etag: None,
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.check_failure(MemoryOp::Get, bucket, key)?;
        self.object(bucket, key)
            .map(|object| object.data)
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        validate_bucket(bucket)?;
        validate_key(key)?;
        self.check_failure(MemoryOp::Put, bucket, key)?;

        let size = data.len();
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| StorageError::BackendError("memory store lock poisoned".to_string()))?;
        buckets.entry(bucket.to_string()).or_default().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
                last_modified: Utc::now(),
            },
        );

        tracing::debug!(bucket = %bucket, key = %key, size_bytes = size, "Memory storage upload");
        Ok(())
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> StorageResult<ListPage> {
        self.check_failure(MemoryOp::List, bucket, prefix)?;
        let buckets = self
            .buckets
            .lock()
            .map_err(|_| StorageError::BackendError("memory store lock poisoned".to_string()))?;

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        Ok(match buckets.get(bucket) {
            Some(objects) => paginate(objects.keys(), prefix, continuation, page_size),
            None => ListPage::default(),
        })
    }

    fn uri(&self, bucket: &str, key: &str) -> String {
        format!("memory://{}/{}", bucket, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
