//! Configuration module
//!
//! `PipelineConfig` names the two buckets the pipeline works with and the storage
//! backend settings. Handlers receive it by constructor injection; only the
//! binary reads the process environment.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::storage_types::StorageBackend;

const LIST_PAGE_SIZE: usize = 1000;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Pipeline configuration
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Bucket receiving processed records and daily summaries.
    pub reports_bucket: String,
    /// Bucket receiving raw uploads. Used as the default source for direct processing.
    pub raw_bucket: Option<String>,
    pub storage_backend: StorageBackend,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub local_storage_path: Option<String>,
    /// Maximum number of keys returned by one listing page.
    pub list_page_size: usize,
    pub environment: String,
    pub log_format: LogFormat,
}

impl PipelineConfig {
    /// Configuration with defaults for everything but the reports bucket.
    pub fn new(reports_bucket: impl Into<String>) -> Self {
        Self {
            reports_bucket: reports_bucket.into(),
            raw_bucket: None,
            storage_backend: StorageBackend::S3,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            list_page_size: LIST_PAGE_SIZE,
            environment: "development".to_string(),
            log_format: LogFormat::Pretty,
        }
    }

    pub fn with_raw_bucket(mut self, raw_bucket: impl Into<String>) -> Self {
        self.raw_bucket = Some(raw_bucket.into());
        self
    }

    pub fn with_storage_backend(mut self, backend: StorageBackend) -> Self {
        self.storage_backend = backend;
        self
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let reports_bucket = env::var("REPORTS_BUCKET")
            .map_err(|_| anyhow::anyhow!("REPORTS_BUCKET must be set"))?;

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::S3,
        };

        let log_format = match env::var("LOG_FORMAT") {
            Ok(value) => value.parse()?,
            Err(_) => LogFormat::Pretty,
        };

        let config = PipelineConfig {
            reports_bucket,
            raw_bucket: env::var("RAW_BUCKET").ok().filter(|b| !b.is_empty()),
            storage_backend,
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            list_page_size: parse_page_size(env::var("LIST_PAGE_SIZE").ok())?,
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.reports_bucket.trim().is_empty() {
            return Err(anyhow::anyhow!("REPORTS_BUCKET must not be empty"));
        }

        if self.list_page_size == 0 {
            return Err(anyhow::anyhow!("LIST_PAGE_SIZE must be greater than zero"));
        }

        match self.storage_backend {
            StorageBackend::S3 if self.s3_region.is_none() => Err(anyhow::anyhow!(
                "STORAGE_BACKEND=s3 requires S3_REGION or AWS_REGION to be set"
            )),
            StorageBackend::Local if self.local_storage_path.is_none() => Err(anyhow::anyhow!(
                "STORAGE_BACKEND=local requires LOCAL_STORAGE_PATH to be set"
            )),
            _ => Ok(()),
        }
    }

    /// Check if the pipeline is running in production mode
    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }
}

fn parse_page_size(raw: Option<String>) -> Result<usize, anyhow::Error> {
    match raw {
        None => Ok(LIST_PAGE_SIZE),
        Some(value) => value.trim().parse().map_err(|e| {
            anyhow::anyhow!("LIST_PAGE_SIZE must be a positive integer, got {:?}: {}", value, e)
        }),
    }
}
