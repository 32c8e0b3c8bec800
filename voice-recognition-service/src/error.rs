use error_common::{codes, Categorized, ErrorCategory};
use std::time::Duration;
use thiserror::Error;

/// Transcription failures.
///
/// "No speech" is not an error; it is [`crate::Transcript::NoSpeech`].
/// Everything here sends the call down the escalation path.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Recording unavailable: {0}")]
    RecordingUnavailable(String),

    #[error("Recording is {size} bytes, limit is {limit}")]
    RecordingTooLarge { size: usize, limit: usize },

    #[error("{provider} provider error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Transcription timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VoiceError {
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        VoiceError::Provider {
            provider,
            message: message.into(),
        }
    }
}

impl Categorized for VoiceError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Backend
    }

    fn code(&self) -> &'static str {
        match self {
            VoiceError::Config(_) => codes::speech::MISCONFIGURED,
            VoiceError::RecordingUnavailable(_) | VoiceError::RecordingTooLarge { .. } => {
                codes::speech::RECORDING_UNAVAILABLE
            }
            VoiceError::Timeout(_) => codes::speech::TIMEOUT,
            VoiceError::Provider { .. } | VoiceError::Network(_) | VoiceError::Serialization(_) => {
                codes::speech::PROVIDER_FAILED
            }
        }
    }
}

pub type VoiceResult<T> = Result<T, VoiceError>;
