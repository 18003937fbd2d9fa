//! Rollup Storage Library
//!
//! This crate provides the blob store abstraction the pipeline reads uploads from
//! and writes artifacts to, with implementations for S3, the local filesystem and
//! an in-memory store.
//!
//! # Addressing
//!
//! Objects are addressed by `(bucket, key)`. Keys use `/` as the separator and must
//! not contain `..` or start with `/`. Listing is paginated: callers either walk
//! pages with `list_page` or let `list_all` follow the continuation tokens.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
#[cfg(feature = "storage-memory")]
pub use memory::{MemoryBlobStore, MemoryOp};
pub use rollup_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use traits::{BlobStore, ListPage, ObjectHead, ObjectMetadata, StorageError, StorageResult};
