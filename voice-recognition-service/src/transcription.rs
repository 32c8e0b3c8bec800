use async_trait::async_trait;
use schedule_store::Language;
use serde::{Deserialize, Serialize};

use crate::error::VoiceResult;

/// Outcome of transcribing one recorded turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transcript {
    Speech {
        text: String,
        /// Language the provider detected, when it reports one
        language: Option<String>,
        confidence: Option<f32>,
    },
    /// Silence, or a recording with nothing recognisable in it
    NoSpeech,
}

impl Transcript {
    /// `NoSpeech` when `text` is blank after trimming
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Transcript::NoSpeech
        } else {
            Transcript::Speech {
                text: trimmed.to_string(),
                language: None,
                confidence: None,
            }
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Transcript::Speech { text, .. } => Some(text),
            Transcript::NoSpeech => None,
        }
    }

    pub fn is_no_speech(&self) -> bool {
        matches!(self, Transcript::NoSpeech)
    }
}

/// Audio plus everything a provider needs to recognise it
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionRequest {
    pub audio: Vec<u8>,
    pub language: Language,
    /// Languages the caller may switch into
    pub alternates: Vec<Language>,
    pub phrases: Vec<String>,
}

/// Turns a provider recording reference into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe_recording(
        &self,
        recording_url: &str,
        language: Language,
        alternates: &[Language],
    ) -> VoiceResult<Transcript>;
}
