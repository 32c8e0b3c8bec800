pub mod markup;
pub mod outbound;
pub mod webhook;

pub use markup::{MarkupError, Verb, VoiceResponse};
pub use outbound::{ExotelClient, OutboundError, PlacedCall};
pub use webhook::{WebhookError, WebhookPayload};

use schedule_store::Language;
use uuid::Uuid;

use crate::routes::paths::voice;

/// Absolute callback URLs handed to the provider inside markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    base: String,
}

impl CallbackUrls {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            base: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build(&self, path: &str, params: &[(&str, &str)]) -> String {
        let query = serde_urlencoded::to_string(params).unwrap_or_default();
        if query.is_empty() {
            format!("{}{}", self.base, path)
        } else {
            format!("{}{}?{}", self.base, path, query)
        }
    }

    pub fn language_selected(&self, call_id: &str) -> String {
        self.build(voice::LANGUAGE_SELECTED, &[("callSid", call_id)])
    }

    pub fn greeting(&self, call_id: &str, language: Language) -> String {
        self.build(
            voice::GREETING,
            &[("callSid", call_id), ("language", language.code())],
        )
    }

    pub fn process_speech(&self, call_id: &str, language: Language) -> String {
        self.build(
            voice::PROCESS_SPEECH,
            &[("callSid", call_id), ("language", language.code())],
        )
    }

    pub fn status_callback(&self) -> String {
        self.build(voice::STATUS_CALLBACK, &[])
    }

    pub fn reminder(&self, appointment_id: Uuid) -> String {
        self.build(
            voice::REMINDER,
            &[("appointmentId", appointment_id.to_string().as_str())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_urls_are_absolute_and_encoded() {
        let urls = CallbackUrls::new("https://voice.citycare.in/");
        assert_eq!(
            urls.process_speech("CA 1&2", Language::Hindi),
            "https://voice.citycare.in/api/voice/process-speech?callSid=CA+1%262&language=hi-IN"
        );
        assert_eq!(
            urls.status_callback(),
            "https://voice.citycare.in/api/voice/status-callback"
        );
    }
}
