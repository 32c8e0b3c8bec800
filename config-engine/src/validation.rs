// Startup checks that serde alone cannot express
use crate::error::{ConfigError, Result};
use crate::settings::{MediConnectConfig, NluBackendKind, SessionStoreKind};

#[derive(Debug, Default)]
pub struct ConfigValidator {
    problems: Vec<String>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects every problem instead of stopping at the first one
    pub fn validate(mut self, config: &MediConnectConfig) -> Result<()> {
        self.check_server(config);
        self.check_telephony(config);
        self.check_languages(config);
        self.check_backends(config);
        self.check_dialogue(config);
        self.check_booking(config);

        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(self.problems))
        }
    }

    fn require(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.problems.push(message.into());
        }
    }

    fn check_server(&mut self, config: &MediConnectConfig) {
        let base = &config.server.public_base_url;
        self.require(
            base.starts_with("http://") || base.starts_with("https://"),
            format!("server.public_base_url must be an http(s) URL, got '{base}'"),
        );
        self.require(
            !base.ends_with('/'),
            "server.public_base_url must not end with '/'",
        );
        self.require(
            config.server.request_timeout_secs > 0,
            "server.request_timeout_secs must be non-zero",
        );
    }

    fn check_telephony(&mut self, config: &MediConnectConfig) {
        let t = &config.telephony;
        self.require(
            t.language_gather_timeout_secs > 0,
            "telephony.language_gather_timeout_secs must be non-zero",
        );
        self.require(
            t.record_max_length_secs > 0,
            "telephony.record_max_length_secs must be non-zero",
        );
        self.require(
            t.record_silence_timeout_secs > 0,
            "telephony.record_silence_timeout_secs must be non-zero",
        );
        self.require(
            t.finish_on_key.len() == 1
                && t.finish_on_key.chars().all(|c| c.is_ascii_digit() || c == '#' || c == '*'),
            "telephony.finish_on_key must be a single keypad key",
        );
    }

    fn check_languages(&mut self, config: &MediConnectConfig) {
        let languages = &config.languages;
        self.require(
            !languages.supported.is_empty(),
            "languages.supported must not be empty",
        );
        self.require(
            languages.supported.contains(&languages.fallback),
            format!(
                "languages.fallback '{}' is not in languages.supported",
                languages.fallback
            ),
        );
    }

    fn check_backends(&mut self, config: &MediConnectConfig) {
        self.require(config.speech.timeout_secs > 0, "speech.timeout_secs must be non-zero");
        // One turn waits on speech then on the NLU backend inside one webhook
        let turn_budget = config.speech.timeout_secs.saturating_add(config.nlu.timeout_secs);
        self.require(
            config.server.request_timeout_secs > turn_budget,
            format!(
                "server.request_timeout_secs ({}) must exceed speech.timeout_secs + nlu.timeout_secs ({turn_budget})",
                config.server.request_timeout_secs
            ),
        );
        self.require(
            config.speech.max_recording_bytes > 0,
            "speech.max_recording_bytes must be non-zero",
        );

        let nlu = &config.nlu;
        self.require(nlu.timeout_secs > 0, "nlu.timeout_secs must be non-zero");
        self.require(nlu.max_turns > 0, "nlu.max_turns must be non-zero");
        self.require(
            nlu.max_response_words > 0,
            "nlu.max_response_words must be non-zero",
        );
        self.require(
            (0.0..=2.0).contains(&nlu.temperature),
            "nlu.temperature must be within 0.0..=2.0",
        );
        if nlu.backend == NluBackendKind::Openai {
            self.require(
                nlu.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()),
                "nlu.api_key is required for the openai backend",
            );
        }
    }

    fn check_dialogue(&mut self, config: &MediConnectConfig) {
        let dialogue = &config.dialogue;
        self.require(
            dialogue.session_ttl_secs > 0,
            "dialogue.session_ttl_secs must be non-zero",
        );
        self.require(
            dialogue.purge_interval_secs > 0,
            "dialogue.purge_interval_secs must be non-zero",
        );
        if dialogue.store == SessionStoreKind::Redis {
            self.require(
                dialogue.redis_url.is_some(),
                "dialogue.redis_url is required for the redis session store",
            );
        }
    }

    fn check_booking(&mut self, config: &MediConnectConfig) {
        let booking = &config.booking;
        self.require(
            booking.slot_minutes > 0 && 24 * 60 % booking.slot_minutes == 0,
            "booking.slot_minutes must divide a day evenly",
        );
        self.require(
            !booking.appointment_prefix.is_empty()
                && booking.appointment_prefix.chars().all(|c| c.is_ascii_alphanumeric()),
            "booking.appointment_prefix must be non-empty alphanumeric",
        );
        self.require(
            (-12 * 60..=14 * 60).contains(&booking.clinic_utc_offset_minutes),
            "booking.clinic_utc_offset_minutes out of range",
        );
        self.require(booking.lookahead_days > 0, "booking.lookahead_days must be non-zero");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_problem_at_once() {
        let mut config = MediConnectConfig::default();
        config.server.public_base_url = "ftp://clinic".to_string();
        config.languages.fallback = "ta-IN".to_string();
        config.booking.slot_minutes = 0;

        match ConfigValidator::new().validate(&config) {
            Err(ConfigError::ValidationError(problems)) => {
                assert_eq!(problems.len(), 3, "{problems:?}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn redis_store_needs_url() {
        let mut config = MediConnectConfig::default();
        config.dialogue.store = SessionStoreKind::Redis;
        assert!(ConfigValidator::new().validate(&config).is_err());

        config.dialogue.redis_url = Some("redis://localhost/".to_string());
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn request_deadline_must_cover_a_whole_turn() {
        let mut config = MediConnectConfig::default();
        config.speech.timeout_secs = 10;
        config.nlu.timeout_secs = 8;

        config.server.request_timeout_secs = 18;
        match ConfigValidator::new().validate(&config) {
            Err(ConfigError::ValidationError(problems)) => {
                assert_eq!(problems.len(), 1, "{problems:?}");
                assert!(problems[0].contains("request_timeout_secs"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        config.server.request_timeout_secs = 19;
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn finish_key_must_be_keypad() {
        let mut config = MediConnectConfig::default();
        config.telephony.finish_on_key = "ok".to_string();
        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
