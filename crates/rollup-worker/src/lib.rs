//! Rollup Worker Library
//!
//! Invocation handlers for the two pipeline stages:
//! - [`IngestionHandler`] processes a batch of upload notifications and writes one
//!   processed record per file.
//! - [`DailyReportHandler`] aggregates one day of processed records into a summary.
//!
//! Each invocation runs to completion on its own and returns an [`Outcome`] that
//! the caller can serialize.

pub mod daily_report;
pub mod events;
pub mod ingestion;
pub mod outcome;

pub use daily_report::{resolve_report_date, DailyReport, DailyReportDetails, DailyReportHandler};
pub use events::{parse_upload_event, EventRecord};
pub use ingestion::{IngestionDetails, IngestionHandler, IngestionReport, ItemResult};
pub use outcome::Outcome;
