pub mod google;
pub mod whisper;

use async_trait::async_trait;

use crate::config::VoiceProvider;
use crate::error::VoiceResult;
use crate::transcription::{RecognitionRequest, Transcript};

/// Trait for speech recognition backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Recognise one recorded turn
    async fn recognize(&self, request: RecognitionRequest) -> VoiceResult<Transcript>;
}

/// Create a provider instance based on configuration
pub fn create_provider(
    config: &VoiceProvider,
    client: reqwest::Client,
) -> Box<dyn SpeechProvider> {
    match config {
        VoiceProvider::Google {
            endpoint,
            api_key,
            model,
        } => Box::new(google::GoogleSpeechProvider::new(
            client,
            endpoint.clone(),
            api_key.clone(),
            model.clone(),
        )),
        VoiceProvider::Whisper {
            api_url,
            api_key,
            model,
        } => Box::new(whisper::WhisperProvider::new(
            client,
            api_url.clone(),
            api_key.clone(),
            model.clone(),
        )),
    }
}
