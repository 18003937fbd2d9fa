//! Structured invocation outcomes.

use serde::Serialize;

/// Result of one invocation, serialized for the caller.
///
/// The `status_code` mirrors HTTP semantics so that schedulers and function
/// runtimes can treat failures as retryable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome<T> {
    Success {
        status_code: u16,
        message: String,
        #[serde(flatten)]
        details: T,
    },
    Failure {
        status_code: u16,
        message: String,
        error: String,
        #[serde(flatten)]
        details: Option<T>,
    },
}

impl<T> Outcome<T> {
    pub fn success(message: impl Into<String>, details: T) -> Self {
        Outcome::Success {
            status_code: 200,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, error: impl ToString, details: Option<T>) -> Self {
        Outcome::Failure {
            status_code: 500,
            message: message.into(),
            error: error.to_string(),
            details,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Success { status_code, .. } | Outcome::Failure { status_code, .. } => {
                *status_code
            }
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success { message, .. } | Outcome::Failure { message, .. } => message,
        }
    }

    pub fn details(&self) -> Option<&T> {
        match self {
            Outcome::Success { details, .. } => Some(details),
            Outcome::Failure { details, .. } => details.as_ref(),
        }
    }
}
