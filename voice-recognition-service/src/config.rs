use config_engine::{SpeechProviderKind, SpeechSettings, TelephonySettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{VoiceError, VoiceResult};

pub const GOOGLE_DEFAULT_ENDPOINT: &str = "https://speech.googleapis.com";
pub const WHISPER_DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Provider-specific configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VoiceProvider {
    /// Google Cloud Speech-to-Text REST API
    Google {
        endpoint: String,
        api_key: Option<String>,
        model: String, // e.g. "phone_call", "latest_short"
    },
    /// Self-hosted Whisper behind an OpenAI-compatible transcription route
    Whisper {
        api_url: String,
        api_key: Option<String>,
        model: String, // e.g. "whisper-1", "large-v3"
    },
}

impl VoiceProvider {
    pub fn name(&self) -> &'static str {
        match self {
            VoiceProvider::Google { .. } => "google",
            VoiceProvider::Whisper { .. } => "whisper",
        }
    }
}

/// Basic-auth pair for downloading provider recordings
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecordingAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RecordingAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Speech adapter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConfig {
    pub provider: VoiceProvider,
    /// Bound on download plus recognition for one turn
    pub timeout: Duration,
    pub max_recording_bytes: usize,
    pub recording_auth: Option<RecordingAuth>,
    pub enable_vocabulary_hints: bool,
}

impl VoiceConfig {
    /// Build from the `speech` and `telephony` configuration sections.
    ///
    /// Recording downloads reuse the telephony API key/token pair when both
    /// are present.
    pub fn from_settings(speech: &SpeechSettings, telephony: &TelephonySettings) -> VoiceResult<Self> {
        if speech.timeout_secs == 0 {
            return Err(VoiceError::Config("speech timeout must be non-zero".to_string()));
        }

        let provider = match speech.provider {
            SpeechProviderKind::Google => VoiceProvider::Google {
                endpoint: trimmed_endpoint(speech.endpoint.as_deref(), GOOGLE_DEFAULT_ENDPOINT),
                api_key: speech.api_key.clone(),
                model: speech.model.clone(),
            },
            SpeechProviderKind::Whisper => VoiceProvider::Whisper {
                api_url: trimmed_endpoint(speech.endpoint.as_deref(), WHISPER_DEFAULT_ENDPOINT),
                api_key: speech.api_key.clone(),
                model: if speech.model == "phone_call" {
                    "whisper-1".to_string()
                } else {
                    speech.model.clone()
                },
            },
        };

        let recording_auth = match (&telephony.api_key, &telephony.api_token) {
            (Some(username), Some(password)) => Some(RecordingAuth {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            provider,
            timeout: Duration::from_secs(speech.timeout_secs),
            max_recording_bytes: speech.max_recording_bytes,
            recording_auth,
            enable_vocabulary_hints: true,
        })
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            provider: VoiceProvider::Google {
                endpoint: GOOGLE_DEFAULT_ENDPOINT.to_string(),
                api_key: None,
                model: "phone_call".to_string(),
            },
            timeout: Duration::from_secs(10),
            max_recording_bytes: 5 * 1024 * 1024,
            recording_auth: None,
            enable_vocabulary_hints: true,
        }
    }
}

fn trimmed_endpoint(configured: Option<&str>, default: &str) -> String {
    configured
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}
