//! Google Cloud Speech-to-Text over REST.
//!
//! Uses the `phone_call` model on 8 kHz LINEAR16 audio, the telephony
//! provider's recording format, with alternate language codes so Hinglish
//! turns still come back.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{VoiceError, VoiceResult};
use crate::providers::SpeechProvider;
use crate::transcription::{RecognitionRequest, Transcript};
use crate::vocabulary::PHRASE_BOOST;

const SAMPLE_RATE_HERTZ: u32 = 8000;

pub struct GoogleSpeechProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeBody<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    alternative_language_codes: Vec<&'static str>,
    model: &'a str,
    use_enhanced: bool,
    enable_automatic_punctuation: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    speech_contexts: Vec<SpeechContext<'a>>,
}

#[derive(Debug, Serialize)]
struct SpeechContext<'a> {
    phrases: &'a [String],
    boost: f32,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
    language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f32>,
}

impl GoogleSpeechProvider {
    pub fn new(
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            client,
            endpoint,
            api_key,
            model,
        }
    }

    fn body<'a>(&'a self, request: &'a RecognitionRequest) -> RecognizeBody<'a> {
        let speech_contexts = if request.phrases.is_empty() {
            Vec::new()
        } else {
            vec![SpeechContext {
                phrases: &request.phrases,
                boost: PHRASE_BOOST,
            }]
        };

        RecognizeBody {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: SAMPLE_RATE_HERTZ,
                language_code: request.language.code(),
                alternative_language_codes: request
                    .alternates
                    .iter()
                    .filter(|l| **l != request.language)
                    .map(|l| l.code())
                    .collect(),
                model: &self.model,
                use_enhanced: true,
                enable_automatic_punctuation: true,
                speech_contexts,
            },
            audio: RecognitionAudio {
                content: STANDARD.encode(&request.audio),
            },
        }
    }
}

/// First alternative of every result, joined with spaces
fn into_transcript(response: RecognizeResponse) -> Transcript {
    let mut language = None;
    let mut confidence = None;
    let mut parts = Vec::new();

    for result in response.results {
        if let Some(best) = result.alternatives.into_iter().next() {
            if !best.transcript.trim().is_empty() {
                parts.push(best.transcript.trim().to_string());
                confidence = confidence.or(best.confidence);
            }
        }
        language = language.or(result.language_code);
    }

    match Transcript::from_text(parts.join(" ")) {
        Transcript::Speech { text, .. } => Transcript::Speech {
            text,
            language,
            confidence,
        },
        Transcript::NoSpeech => Transcript::NoSpeech,
    }
}

#[async_trait]
impl SpeechProvider for GoogleSpeechProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn recognize(&self, request: RecognitionRequest) -> VoiceResult<Transcript> {
        let url = format!("{}/v1p1beta1/speech:recognize", self.endpoint);
        let mut call = self.client.post(&url).json(&self.body(&request));
        if let Some(key) = &self.api_key {
            call = call.query(&[("key", key)]);
        }

        let response = call.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(VoiceError::provider(
                "google",
                format!("recognize returned {status}: {}", detail.chars().take(200).collect::<String>()),
            ));
        }

        let parsed: RecognizeResponse = response.json().await?;
        let transcript = into_transcript(parsed);
        debug!(
            language = request.language.code(),
            no_speech = transcript.is_no_speech(),
            "Google recognition finished"
        );
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedule_store::Language;
    use serde_json::json;

    fn provider() -> GoogleSpeechProvider {
        GoogleSpeechProvider::new(
            reqwest::Client::new(),
            "https://speech.googleapis.com".to_string(),
            None,
            "phone_call".to_string(),
        )
    }

    #[test]
    fn request_body_carries_phone_model_hints_and_alternates() {
        let request = RecognitionRequest {
            audio: vec![1, 2, 3],
            language: Language::Hindi,
            alternates: vec![Language::Hindi, Language::English],
            phrases: vec!["appointment".to_string(), "कल".to_string()],
        };
        let provider = provider();

        let body = serde_json::to_value(provider.body(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "config": {
                    "encoding": "LINEAR16",
                    "sampleRateHertz": 8000,
                    "languageCode": "hi-IN",
                    "alternativeLanguageCodes": ["en-IN"],
                    "model": "phone_call",
                    "useEnhanced": true,
                    "enableAutomaticPunctuation": true,
                    "speechContexts": [{ "phrases": ["appointment", "कल"], "boost": 15.0 }]
                },
                "audio": { "content": "AQID" }
            })
        );
    }

    #[test]
    fn results_are_joined_and_empty_responses_mean_no_speech() {
        let response: RecognizeResponse = serde_json::from_value(json!({
            "results": [
                { "alternatives": [{ "transcript": "mujhe kal", "confidence": 0.91 }], "languageCode": "hi-in" },
                { "alternatives": [{ "transcript": " heart doctor chahiye " }] }
            ]
        }))
        .unwrap();

        assert_eq!(
            into_transcript(response),
            Transcript::Speech {
                text: "mujhe kal heart doctor chahiye".to_string(),
                language: Some("hi-in".to_string()),
                confidence: Some(0.91),
            }
        );

        let empty: RecognizeResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(into_transcript(empty), Transcript::NoSpeech);
    }
}
