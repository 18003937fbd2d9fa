//! Rollup Processing Library
//!
//! Per-file record counting, the file processor that turns an uploaded object
//! into a `ProcessingResult`, and the aggregation of a day's results into a
//! `DailySummary`.

pub mod aggregator;
pub mod file_processor;
pub mod record_counter;

pub use aggregator::{aggregate, aggregate_at};
pub use file_processor::{FileMetadata, FileProcessor};
pub use record_counter::{count_records, CountError, RecordFormat};
