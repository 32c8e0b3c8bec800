// Logger configuration
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Default filter directive when `RUST_LOG` is unset, e.g. `info`
    pub level: String,
    /// JSON lines instead of the coloured development format
    pub json: bool,
    /// Run every formatted line through the PII redactor
    pub redact_pii: bool,
    /// Daily-rolling log directory; stdout when unset
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            redact_pii: true,
            directory: None,
            file_prefix: "mediconnect.log".to_string(),
        }
    }
}

impl LoggerConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn default_directive(&self) -> String {
        format!(
            "{level},tower_http=info,sqlx=warn,hyper=info,reqwest=info",
            level = self.level
        )
    }
}
