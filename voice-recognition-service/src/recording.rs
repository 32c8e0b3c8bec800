use async_trait::async_trait;
use tracing::debug;

use crate::config::RecordingAuth;
use crate::error::{VoiceError, VoiceResult};

/// Where recorded turns are downloaded from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordingSource: Send + Sync {
    async fn fetch(&self, url: &str) -> VoiceResult<Vec<u8>>;
}

/// Downloads provider recordings over HTTP(S) with a size cap
pub struct RecordingFetcher {
    client: reqwest::Client,
    auth: Option<RecordingAuth>,
    max_bytes: usize,
}

impl RecordingFetcher {
    pub fn new(client: reqwest::Client, auth: Option<RecordingAuth>, max_bytes: usize) -> Self {
        Self {
            client,
            auth,
            max_bytes,
        }
    }
}

#[async_trait]
impl RecordingSource for RecordingFetcher {
    async fn fetch(&self, url: &str) -> VoiceResult<Vec<u8>> {
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(VoiceError::RecordingUnavailable(
                "recording reference is not an http(s) URL".to_string(),
            ));
        }

        let mut request = self.client.get(url);
        if let Some(auth) = &self.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let mut response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(VoiceError::RecordingUnavailable(format!(
                "recording download returned {status}"
            )));
        }

        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            if length > self.max_bytes {
                return Err(VoiceError::RecordingTooLarge {
                    size: length,
                    limit: self.max_bytes,
                });
            }
        }

        let mut audio = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if audio.len() + chunk.len() > self.max_bytes {
                return Err(VoiceError::RecordingTooLarge {
                    size: audio.len() + chunk.len(),
                    limit: self.max_bytes,
                });
            }
            audio.extend_from_slice(&chunk);
        }

        debug!(bytes = audio.len(), "Recording downloaded");
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_http_references_are_rejected_without_a_request() {
        let fetcher = RecordingFetcher::new(reqwest::Client::new(), None, 1024);

        let err = fetcher.fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, VoiceError::RecordingUnavailable(_)));
    }
}
