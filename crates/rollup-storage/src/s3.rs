use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, GetOptions, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};

use crate::traits::{BlobStore, ListPage, ObjectHead, ObjectMetadata, StorageError, StorageResult};
use crate::StorageBackend;

const DEFAULT_PAGE_SIZE: usize = 1000;

/// S3 storage implementation
///
/// `object_store` clients are bound to one bucket, so a client is built lazily
/// per bucket and cached.
pub struct S3BlobStore {
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    page_size: usize,
    clients: Mutex<HashMap<String, Arc<AmazonS3>>>,
}

impl S3BlobStore {
    /// Create a new S3BlobStore instance
    ///
    /// # Arguments
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(region: String, endpoint_url: Option<String>) -> Self {
        S3BlobStore {
            region,
            endpoint_url,
            page_size: DEFAULT_PAGE_SIZE,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Set the maximum number of keys per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn client(&self, bucket: &str) -> StorageResult<Arc<AmazonS3>> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|_| StorageError::BackendError("S3 client cache lock poisoned".to_string()))?;

        if let Some(client) = clients.get(bucket) {
            return Ok(client.clone());
        }

        // Credentials come from the environment; region and endpoint are explicit.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(self.region.clone())
            .with_bucket_name(bucket.to_string());

        if let Some(ref endpoint) = self.endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let client = Arc::new(
            builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?,
        );
        clients.insert(bucket.to_string(), client.clone());
        Ok(client)
    }

    fn not_found_or(
        bucket: &str,
        key: &str,
        err: ObjectStoreError,
        wrap: fn(String) -> StorageError,
    ) -> StorageError {
        match err {
            ObjectStoreError::NotFound { .. } => {
                StorageError::NotFound(format!("{}/{}", bucket, key))
            }
            other => wrap(other.to_string()),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn head(&self, bucket: &str, key: &str) -> StorageResult<ObjectHead> {
        let client = self.client(bucket)?;
        let location = Path::from(key.to_string());
        let options = GetOptions {
            head: true,
            ..Default::default()
        };

        let result = client
            .get_opts(&location, options)
            .await
            .map_err(|e| Self::not_found_or(bucket, key, e, StorageError::BackendError))?;

        let content_type = result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| value.to_string());

        Ok(ObjectHead {
            size: result.meta.size as u64,
            content_type,
            last_modified: Some(result.meta.last_modified),
            etag: result.meta.e_tag.map(|etag| etag.trim_matches('"').to_string()),
        })
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let client = self.client(bucket)?;
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = client.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(format!("{}/{}", bucket, key)),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()> {
        let client = self.client(bucket)?;
        let size = data.len() as u64;
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        for (name, value) in metadata {
            attributes.insert(Attribute::Metadata(name.clone().into()), value.clone().into());
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let result: ObjectResult<_> = client
            .put_opts(&location, PutPayload::from(Bytes::from(data)), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    /// `object_store` treats prefixes as path segments, so results are also
    /// filtered on the raw string prefix. The continuation token is the last key
    /// of the previous page, used as the listing offset.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> StorageResult<ListPage> {
        let client = self.client(bucket)?;
        let prefix_path = Some(Path::from(prefix.to_string())).filter(|p| !p.as_ref().is_empty());

        let mut stream = match continuation {
            Some(token) => {
                client.list_with_offset(prefix_path.as_ref(), &Path::from(token.to_string()))
            }
            None => client.list(prefix_path.as_ref()),
        };

        let mut keys = Vec::new();
        let mut has_more = false;
        while let Some(item) = stream.next().await {
            let meta = item.map_err(|e| StorageError::ListFailed(e.to_string()))?;
            let key = meta.location.to_string();
            if !key.starts_with(prefix) {
                continue;
            }
            if keys.len() == self.page_size {
                has_more = true;
                break;
            }
            keys.push(key);
        }

        let next_token = if has_more { keys.last().cloned() } else { None };
        Ok(ListPage { keys, next_token })
    }

    fn uri(&self, bucket: &str, key: &str) -> String {
        format!("s3://{}/{}", bucket, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
