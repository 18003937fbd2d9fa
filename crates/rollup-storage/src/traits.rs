//! Blob store abstraction trait
//!
//! This module defines the BlobStore trait that all storage backends must implement.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for rollup_core::PipelineError {
    fn from(err: StorageError) -> Self {
        rollup_core::PipelineError::Storage(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// User metadata attached to an object on upload.
pub type ObjectMetadata = BTreeMap<String, String>;

/// Object metadata returned by `head`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectHead {
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Token for the next page; `None` when the listing is exhausted.
    pub next_token: Option<String>,
}

/// Blob store abstraction trait
///
/// All storage backends (S3, local filesystem, memory) implement this trait so
/// that the processing and report stages never depend on a concrete backend.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch object metadata without the body.
    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectHead>;

    /// Download a whole object.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Upload an object, replacing any existing one at the same key.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()>;

    /// List one page of keys starting with `prefix`, in lexicographic order.
    ///
    /// `continuation` is the `next_token` of the previous page.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> StorageResult<ListPage>;

    /// List every key starting with `prefix`, following continuation tokens
    /// until the listing is exhausted.
    async fn list_all(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self.list_page(bucket, prefix, token.as_deref()).await?;
            pages += 1;
            keys.extend(page.keys);

            match page.next_token {
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    return Err(StorageError::ListFailed(format!(
                        "continuation token {} repeated while listing {}/{}",
                        next, bucket, prefix
                    )));
                }
                Some(next) => token = Some(next),
                None => break,
            }
        }

        tracing::debug!(
            bucket = %bucket,
            prefix = %prefix,
            pages,
            keys = keys.len(),
            "Listing complete"
        );

        Ok(keys)
    }

    /// Human-readable location of an object, e.g. `s3://bucket/key`.
    fn uri(&self, bucket: &str, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
