use error_common::{codes, Categorized, ErrorCategory};
use std::time::Duration;
use thiserror::Error;

/// Dialogue session store failures
#[derive(Error, Debug)]
pub enum SessionError {
    /// The call has ended and its session is gone
    #[error("No dialogue session for call {0}")]
    NotFound(String),

    #[error("Session cache error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Session encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;

impl Categorized for SessionError {
    fn category(&self) -> ErrorCategory {
        match self {
            SessionError::NotFound(_) => ErrorCategory::Protocol,
            SessionError::Redis(_) | SessionError::Serialization(_) => ErrorCategory::Backend,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            SessionError::NotFound(_) => codes::telephony::SESSION_GONE,
            SessionError::Redis(_) | SessionError::Serialization(_) => {
                codes::store::CONNECTION_FAILED
            }
        }
    }
}

/// Slot-filling backend failures. All of them end the dialogue in a hand-off.
#[derive(Error, Debug)]
pub enum NluError {
    #[error("NLU backend failed: {0}")]
    Backend(String),

    #[error("NLU request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("NLU output is malformed: {0}")]
    MalformedOutput(String),

    /// The backend named a dialogue state outside the allowed set
    #[error("NLU proposed unknown state '{0}'")]
    InvalidState(String),

    #[error("NLU backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("NLU backend misconfigured: {0}")]
    Misconfigured(String),
}

pub type NluResult<T> = std::result::Result<T, NluError>;

impl From<serde_json::Error> for NluError {
    fn from(err: serde_json::Error) -> Self {
        NluError::MalformedOutput(err.to_string())
    }
}

impl Categorized for NluError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Backend
    }

    fn code(&self) -> &'static str {
        match self {
            NluError::Backend(_) | NluError::Http(_) | NluError::Misconfigured(_) => {
                codes::nlu::BACKEND_FAILED
            }
            NluError::MalformedOutput(_) => codes::nlu::MALFORMED_OUTPUT,
            NluError::InvalidState(_) => codes::nlu::INVALID_STATE,
            NluError::Timeout(_) => codes::nlu::TIMEOUT,
        }
    }
}
