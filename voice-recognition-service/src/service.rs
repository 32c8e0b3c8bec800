use async_trait::async_trait;
use schedule_store::Language;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::VoiceConfig;
use crate::error::{VoiceError, VoiceResult};
use crate::providers::{create_provider, SpeechProvider};
use crate::recording::{RecordingFetcher, RecordingSource};
use crate::transcription::{RecognitionRequest, Transcriber, Transcript};
use crate::vocabulary::BookingVocabulary;

/// Speech transcription for recorded telephone turns
pub struct VoiceService {
    config: VoiceConfig,
    recordings: Arc<dyn RecordingSource>,
    provider: Arc<dyn SpeechProvider>,
}

impl VoiceService {
    /// Create the service with an HTTP recording fetcher and the configured provider
    pub fn new(config: VoiceConfig) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VoiceError::Config(format!("http client: {e}")))?;

        let provider: Arc<dyn SpeechProvider> =
            Arc::from(create_provider(&config.provider, client.clone()));
        let recordings = Arc::new(RecordingFetcher::new(
            client,
            config.recording_auth.clone(),
            config.max_recording_bytes,
        ));

        info!(provider = provider.name(), "Voice recognition service ready");
        Ok(Self::with_parts(config, recordings, provider))
    }

    pub fn with_parts(
        config: VoiceConfig,
        recordings: Arc<dyn RecordingSource>,
        provider: Arc<dyn SpeechProvider>,
    ) -> Self {
        Self {
            config,
            recordings,
            provider,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    async fn fetch_and_recognize(
        &self,
        recording_url: &str,
        language: Language,
        alternates: &[Language],
    ) -> VoiceResult<Transcript> {
        let audio = self.recordings.fetch(recording_url).await?;
        if audio.is_empty() {
            debug!("Empty recording, treating as no speech");
            return Ok(Transcript::NoSpeech);
        }

        let phrases = if self.config.enable_vocabulary_hints {
            BookingVocabulary::phrases(language)
        } else {
            Vec::new()
        };

        self.provider
            .recognize(RecognitionRequest {
                audio,
                language,
                alternates: alternates.to_vec(),
                phrases,
            })
            .await
    }
}

#[async_trait]
impl Transcriber for VoiceService {
    async fn transcribe_recording(
        &self,
        recording_url: &str,
        language: Language,
        alternates: &[Language],
    ) -> VoiceResult<Transcript> {
        let started = std::time::Instant::now();
        let outcome = tokio::time::timeout(
            self.config.timeout,
            self.fetch_and_recognize(recording_url, language, alternates),
        )
        .await;

        match outcome {
            Ok(Ok(transcript)) => {
                debug!(
                    provider = self.provider.name(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    no_speech = transcript.is_no_speech(),
                    "Turn transcribed"
                );
                Ok(transcript)
            }
            Ok(Err(e)) => {
                warn!(provider = self.provider.name(), error = %e, "Transcription failed");
                Err(e)
            }
            Err(_) => {
                warn!(
                    provider = self.provider.name(),
                    timeout = ?self.config.timeout,
                    "Transcription timed out"
                );
                Err(VoiceError::Timeout(self.config.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockSpeechProvider;
    use crate::recording::MockRecordingSource;
    use mockall::predicate::eq;
    use std::time::Duration;

    fn config() -> VoiceConfig {
        VoiceConfig {
            timeout: Duration::from_millis(200),
            ..VoiceConfig::default()
        }
    }

    fn recordings_returning(audio: Vec<u8>) -> MockRecordingSource {
        let mut recordings = MockRecordingSource::new();
        recordings
            .expect_fetch()
            .with(eq("https://recordings.example/turn-1.wav"))
            .times(1)
            .returning(move |_| Ok(audio.clone()));
        recordings
    }

    #[tokio::test]
    async fn empty_recording_is_no_speech_without_calling_the_provider() {
        let mut provider = MockSpeechProvider::new();
        provider.expect_recognize().never();
        provider.expect_name().return_const("mock");

        let service = VoiceService::with_parts(
            config(),
            Arc::new(recordings_returning(Vec::new())),
            Arc::new(provider),
        );

        let transcript = service
            .transcribe_recording("https://recordings.example/turn-1.wav", Language::Hindi, &[])
            .await
            .unwrap();
        assert_eq!(transcript, Transcript::NoSpeech);
    }

    #[tokio::test]
    async fn provider_gets_hints_and_alternates() {
        let mut provider = MockSpeechProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_recognize()
            .withf(|req| {
                req.language == Language::Hindi
                    && req.alternates == vec![Language::English]
                    && req.phrases.iter().any(|p| p == "कल")
                    && req.audio == vec![7, 7, 7]
            })
            .times(1)
            .returning(|_| Ok(Transcript::from_text("kal subah")));

        let service = VoiceService::with_parts(
            config(),
            Arc::new(recordings_returning(vec![7, 7, 7])),
            Arc::new(provider),
        );

        let transcript = service
            .transcribe_recording(
                "https://recordings.example/turn-1.wav",
                Language::Hindi,
                &[Language::English],
            )
            .await
            .unwrap();
        assert_eq!(transcript.text(), Some("kal subah"));
    }

    #[tokio::test]
    async fn provider_failure_is_an_error_not_silence() {
        let mut provider = MockSpeechProvider::new();
        provider.expect_name().return_const("mock");
        provider
            .expect_recognize()
            .returning(|_| Err(VoiceError::provider("mock", "quota exceeded")));

        let service = VoiceService::with_parts(
            config(),
            Arc::new(recordings_returning(vec![1])),
            Arc::new(provider),
        );

        let err = service
            .transcribe_recording("https://recordings.example/turn-1.wav", Language::English, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::Provider { .. }));
    }

    struct StalledProvider;

    #[async_trait]
    impl SpeechProvider for StalledProvider {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn recognize(&self, _request: RecognitionRequest) -> VoiceResult<Transcript> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Transcript::NoSpeech)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_provider_times_out() {
        let service = VoiceService::with_parts(
            config(),
            Arc::new(recordings_returning(vec![1])),
            Arc::new(StalledProvider),
        );

        let err = service
            .transcribe_recording("https://recordings.example/turn-1.wav", Language::English, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, VoiceError::Timeout(_)));
    }
}
