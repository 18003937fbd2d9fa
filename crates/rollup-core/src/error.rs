//! Error types module
//!
//! `PipelineError` covers the failures a handler can surface to its caller.
//! Storage failures arrive already rendered as strings so that this crate does
//! not depend on any storage backend.

/// Errors surfaced by pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

impl PipelineError {
    /// Whether retrying the failed step could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::Storage(_))
    }
}

/// Result type for pipeline stages
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PipelineError::Storage("bucket unreachable".to_string());
        assert_eq!(err.to_string(), "Storage error: bucket unreachable");
        assert!(err.is_recoverable());

        let err = PipelineError::InvalidEvent("missing Records".to_string());
        assert_eq!(err.to_string(), "Invalid event: missing Records");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PipelineError = json_err.into();
        assert!(matches!(err, PipelineError::Serialization(_)));
    }
}
