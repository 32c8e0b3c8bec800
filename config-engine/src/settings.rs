use serde::{Deserialize, Serialize};

use logger_redacted::LoggerConfig;

/// Root configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediConnectConfig {
    pub server: ServerSettings,
    pub telephony: TelephonySettings,
    pub languages: LanguageSettings,
    pub speech: SpeechSettings,
    pub nlu: NluSettings,
    pub dialogue: DialogueSettings,
    pub booking: BookingSettings,
    pub database: DatabaseSettings,
    pub logging: LoggerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Externally reachable base used to build webhook callback URLs
    pub public_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonySettings {
    pub account_sid: Option<String>,
    pub api_key: Option<String>,
    pub api_token: Option<String>,
    /// Number presented on outbound reminder calls
    pub caller_id: Option<String>,
    pub api_base_url: String,
    pub language_gather_timeout_secs: u32,
    pub record_max_length_secs: u32,
    pub record_silence_timeout_secs: u32,
    pub finish_on_key: String,
}

impl Default for TelephonySettings {
    fn default() -> Self {
        Self {
            account_sid: None,
            api_key: None,
            api_token: None,
            caller_id: None,
            api_base_url: "https://api.exotel.com".to_string(),
            language_gather_timeout_secs: 10,
            record_max_length_secs: 30,
            record_silence_timeout_secs: 5,
            finish_on_key: "#".to_string(),
        }
    }
}

impl TelephonySettings {
    /// Outbound calling needs the full credential triple
    pub fn outbound_enabled(&self) -> bool {
        self.account_sid.is_some() && self.api_key.is_some() && self.api_token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSettings {
    pub supported: Vec<String>,
    /// Used when the caller presses nothing (or nothing valid) at the language menu
    pub fallback: String,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            supported: vec!["hi-IN".to_string(), "en-IN".to_string()],
            fallback: "en-IN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProviderKind {
    Google,
    Whisper,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub provider: SpeechProviderKind,
    /// Overrides the provider's default endpoint
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub region: Option<String>,
    pub timeout_secs: u64,
    pub max_recording_bytes: usize,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            provider: SpeechProviderKind::Google,
            endpoint: None,
            api_key: None,
            model: "phone_call".to_string(),
            region: None,
            timeout_secs: 10,
            max_recording_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NluBackendKind {
    Openai,
    Rules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NluSettings {
    pub backend: NluBackendKind,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_turns: u32,
    pub max_response_words: usize,
}

impl Default for NluSettings {
    fn default() -> Self {
        Self {
            backend: NluBackendKind::Rules,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 500,
            timeout_secs: 8,
            max_turns: 6,
            max_response_words: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStoreKind {
    Memory,
    Redis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueSettings {
    pub max_no_speech_retries: u32,
    pub session_ttl_secs: u64,
    pub purge_interval_secs: u64,
    pub store: SessionStoreKind,
    pub redis_url: Option<String>,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            max_no_speech_retries: 3,
            session_ttl_secs: 30 * 60,
            purge_interval_secs: 60,
            store: SessionStoreKind::Memory,
            redis_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSettings {
    pub slot_minutes: u32,
    pub appointment_prefix: String,
    /// Minutes east of UTC for the clinic's wall clock (IST = 330)
    pub clinic_utc_offset_minutes: i32,
    pub max_alternatives: usize,
    pub lookahead_days: u32,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            appointment_prefix: "MED".to_string(),
            clinic_utc_offset_minutes: 330,
            max_alternatives: 3,
            lookahead_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// In-memory store when unset
    pub url: Option<String>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            run_migrations: true,
        }
    }
}
