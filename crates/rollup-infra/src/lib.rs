//! Rollup Infrastructure Library
//!
//! Shared infrastructure used by the Rollup binaries:
//! - Telemetry initialization (tracing subscriber, pretty or JSON output)

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, DEFAULT_LOG_FILTER};
