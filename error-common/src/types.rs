use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::context::ErrorContext;

/// How a failure is surfaced to a caller who is still on the line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// No speech, ambiguous key-press: re-prompt, bounded retries
    Input,
    /// A dependency failed: apologise and escalate, never retried mid-call
    Backend,
    /// A domain rule said no: spoken as an ordinary reply
    BusinessRule,
    /// The webhook itself was unusable: safe default markup
    Protocol,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Backend => "backend",
            ErrorCategory::BusinessRule => "business_rule",
            ErrorCategory::Protocol => "protocol",
        }
    }

    /// The caller can be asked again without leaving the current state
    pub fn is_recoverable_in_call(&self) -> bool {
        matches!(self, ErrorCategory::Input | ErrorCategory::BusinessRule)
    }

    /// The failure must end with a human hand-off
    pub fn requires_escalation(&self) -> bool {
        matches!(self, ErrorCategory::Backend)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every domain error in the workspace
pub trait Categorized {
    fn category(&self) -> ErrorCategory;

    /// Stable code from [`crate::codes`]
    fn code(&self) -> &'static str;
}

/// Simplified error enum for the binary edge
#[derive(Error, Debug)]
pub enum MediConnectError {
    /// Server configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Network communication errors
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server runtime errors
    #[error("Server error: {0}")]
    ServerError(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// External service errors
    #[error("External service error: {0}")]
    ExternalError(String),

    /// Wrapped external errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for MediConnect operations
pub type Result<T> = std::result::Result<T, MediConnectError>;

/// Log a categorized failure with its call context
pub fn log_categorized<E>(context: &ErrorContext, error: &E)
where
    E: Categorized + fmt::Display,
{
    match error.category() {
        ErrorCategory::Backend => tracing::error!(
            context = %context,
            category = %error.category(),
            code = error.code(),
            error = %error,
            "Backend failure during call"
        ),
        ErrorCategory::Protocol => tracing::warn!(
            context = %context,
            category = %error.category(),
            code = error.code(),
            error = %error,
            "Malformed telephony webhook"
        ),
        ErrorCategory::Input | ErrorCategory::BusinessRule => tracing::info!(
            context = %context,
            category = %error.category(),
            code = error.code(),
            error = %error,
            "Recoverable call failure"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backend_failures_escalate() {
        assert!(ErrorCategory::Backend.requires_escalation());
        assert!(!ErrorCategory::Input.requires_escalation());
        assert!(!ErrorCategory::BusinessRule.requires_escalation());
        assert!(!ErrorCategory::Protocol.requires_escalation());
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCategory::BusinessRule).unwrap();
        assert_eq!(json, "\"business_rule\"");
    }
}
