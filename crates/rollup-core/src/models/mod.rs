//! Domain models
//!
//! Both artifacts the pipeline writes are plain value objects. They are built by a
//! single handler and handed to storage as pretty-printed JSON.

pub mod daily_summary;
pub mod processing_result;

pub use daily_summary::{DailySummary, FileDigest};
pub use processing_result::{ProcessingResult, ProcessingStatus};
