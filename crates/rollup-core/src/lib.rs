//! Rollup Core Library
//!
//! This crate provides the domain models, error types, configuration, and artifact
//! key layout shared by the ingestion and daily report stages.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod timestamp;

// Re-export commonly used types
pub use config::{LogFormat, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use models::{DailySummary, FileDigest, ProcessingResult, ProcessingStatus};
pub use storage_types::StorageBackend;
