use error_common::{codes, Categorized, ErrorCategory};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    SourceNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    ParseError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {}", .0.join("; "))]
    ValidationError(Vec<String>),
}

impl Categorized for ConfigError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Backend
    }

    fn code(&self) -> &'static str {
        match self {
            ConfigError::ValidationError(_) => codes::config::INVALID_VALUE,
            ConfigError::SourceNotFound(_) | ConfigError::ParseError(_) => {
                codes::config::LOAD_FAILED
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
