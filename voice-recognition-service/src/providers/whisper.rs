//! Self-hosted Whisper behind an OpenAI-compatible
//! `/v1/audio/transcriptions` route. Phrase hints travel as the prompt.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::error::{VoiceError, VoiceResult};
use crate::providers::SpeechProvider;
use crate::transcription::{RecognitionRequest, Transcript};

pub struct WhisperProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
    language: Option<String>,
}

impl WhisperProvider {
    pub fn new(
        client: reqwest::Client,
        api_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            client,
            api_url,
            api_key,
            model,
        }
    }
}

/// Whisper takes ISO-639-1 codes, `hi-IN` -> `hi`
fn iso_639_1(code: &str) -> &str {
    code.split('-').next().unwrap_or(code)
}

#[async_trait]
impl SpeechProvider for WhisperProvider {
    fn name(&self) -> &'static str {
        "whisper"
    }

    async fn recognize(&self, request: RecognitionRequest) -> VoiceResult<Transcript> {
        let file = Part::bytes(request.audio)
            .file_name("turn.wav")
            .mime_str("audio/wav")?;

        let mut form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("language", iso_639_1(request.language.code()).to_string())
            .text("response_format", "json");
        if !request.phrases.is_empty() {
            form = form.text("prompt", request.phrases.join(", "));
        }

        let url = format!("{}/v1/audio/transcriptions", self.api_url);
        let mut call = self.client.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::provider(
                "whisper",
                format!("transcription returned {status}"),
            ));
        }

        let parsed: TranscriptionResponse = response.json().await?;
        debug!(chars = parsed.text.len(), "Whisper transcription finished");

        Ok(match Transcript::from_text(parsed.text) {
            Transcript::Speech {
                text, confidence, ..
            } => Transcript::Speech {
                text,
                language: parsed.language,
                confidence,
            },
            Transcript::NoSpeech => Transcript::NoSpeech,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_are_shortened() {
        assert_eq!(iso_639_1("hi-IN"), "hi");
        assert_eq!(iso_639_1("en"), "en");
    }
}
