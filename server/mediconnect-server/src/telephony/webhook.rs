//! Provider webhook payloads.
//!
//! The provider mixes query-string and form-body parameters and is loose
//! about key casing (`CallSid`, `callSid`, `call_sid`), so payloads are
//! read as raw pairs and folded into a [`WebhookPayload`] by normalised key.
//! Body values win over query values.

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::header,
    response::{IntoResponse, Response},
};
use error_common::{codes, log_categorized, Categorized, ErrorCategory, ErrorContext};
use thiserror::Error;

use super::markup::VoiceResponse;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook carries no call id")]
    MissingCallId,
    #[error("malformed webhook payload: {0}")]
    Malformed(String),
}

impl Categorized for WebhookError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Protocol
    }

    fn code(&self) -> &'static str {
        match self {
            WebhookError::MissingCallId => codes::telephony::MISSING_CALL_ID,
            WebhookError::Malformed(_) => codes::telephony::MALFORMED_WEBHOOK,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        log_categorized(&ErrorContext::new(), &self);
        VoiceResponse::technical_difficulties().into_response()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookPayload {
    pub call_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub digits: Option<String>,
    pub recording_url: Option<String>,
    pub status: Option<String>,
    pub duration_secs: Option<u32>,
    /// Language code carried on our own callback URLs
    pub language: Option<String>,
}

fn normalise_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Providers quote some values, e.g. `Digits="1"`
fn clean_value(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_matches('"').trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl WebhookPayload {
    /// Fold raw key/value pairs; the first non-empty value per field wins
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut payload = WebhookPayload::default();
        for (key, value) in pairs {
            let Some(value) = clean_value(value.as_ref()) else {
                continue;
            };
            let slot = match normalise_key(key.as_ref()).as_str() {
                "callsid" | "callid" => &mut payload.call_id,
                "from" | "callfrom" => &mut payload.from,
                "to" | "callto" | "dialwhomnumber" => &mut payload.to,
                "digits" => &mut payload.digits,
                "recordingurl" | "recordurl" => &mut payload.recording_url,
                "status" | "callstatus" => &mut payload.status,
                "duration" | "callduration" | "dialcallduration" => {
                    if payload.duration_secs.is_none() {
                        payload.duration_secs = value.parse().ok();
                    }
                    continue;
                }
                "language" => &mut payload.language,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        payload
    }

    pub fn merge(self, fallback: WebhookPayload) -> Self {
        Self {
            call_id: self.call_id.or(fallback.call_id),
            from: self.from.or(fallback.from),
            to: self.to.or(fallback.to),
            digits: self.digits.or(fallback.digits),
            recording_url: self.recording_url.or(fallback.recording_url),
            status: self.status.or(fallback.status),
            duration_secs: self.duration_secs.or(fallback.duration_secs),
            language: self.language.or(fallback.language),
        }
    }

    pub fn require_call_id(&self) -> Result<&str, WebhookError> {
        self.call_id.as_deref().ok_or(WebhookError::MissingCallId)
    }

    fn from_json(bytes: &[u8]) -> Result<Self, WebhookError> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| WebhookError::Malformed(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| WebhookError::Malformed("JSON body is not an object".to_string()))?;
        let pairs = object.iter().filter_map(|(k, v)| {
            let text = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((k.clone(), text))
        });
        Ok(Self::from_pairs(pairs))
    }

    fn from_form(raw: &[u8]) -> Result<Self, WebhookError> {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_bytes(raw).map_err(|e| WebhookError::Malformed(e.to_string()))?;
        Ok(Self::from_pairs(pairs))
    }
}

#[async_trait]
impl<S> FromRequest<S> for WebhookPayload
where
    S: Send + Sync,
{
    type Rejection = WebhookError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let query = Self::from_form(req.uri().query().unwrap_or_default().as_bytes())?;
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| WebhookError::Malformed(e.to_string()))?;
        if body.is_empty() {
            return Ok(query);
        }

        let from_body = if is_json {
            Self::from_json(&body)?
        } else {
            Self::from_form(&body)?
        };
        Ok(from_body.merge(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[test]
    fn keys_match_regardless_of_casing() {
        let payload = WebhookPayload::from_pairs([
            ("CallSid", "CA1"),
            ("CallFrom", "09876543210"),
            ("DialWhomNumber", "01140036376"),
            ("digits", "\"2\""),
            ("RecordingUrl", " "),
            ("CallDuration", "42"),
        ]);
        assert_eq!(payload.call_id.as_deref(), Some("CA1"));
        assert_eq!(payload.from.as_deref(), Some("09876543210"));
        assert_eq!(payload.to.as_deref(), Some("01140036376"));
        assert_eq!(payload.digits.as_deref(), Some("2"));
        assert_eq!(payload.recording_url, None);
        assert_eq!(payload.duration_secs, Some(42));
    }

    #[tokio::test]
    async fn body_values_win_over_query() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/voice/process-speech?callSid=CA7&language=hi-IN&RecordingUrl=old")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("RecordingUrl=https%3A%2F%2Frec.test%2F1.wav&Status=completed"))
            .unwrap();

        let payload = WebhookPayload::from_request(request, &()).await.unwrap();
        assert_eq!(payload.call_id.as_deref(), Some("CA7"));
        assert_eq!(payload.language.as_deref(), Some("hi-IN"));
        assert_eq!(payload.recording_url.as_deref(), Some("https://rec.test/1.wav"));
        assert_eq!(payload.status.as_deref(), Some("completed"));
    }

    #[tokio::test]
    async fn json_bodies_are_accepted() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/voice/status-callback")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"CallSid":"CA8","Status":"busy","Duration":0}"#))
            .unwrap();

        let payload = WebhookPayload::from_request(request, &()).await.unwrap();
        assert_eq!(payload.call_id.as_deref(), Some("CA8"));
        assert_eq!(payload.duration_secs, Some(0));
    }

    #[tokio::test]
    async fn garbage_json_is_rejected() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/voice/incoming")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("[1,2"))
            .unwrap();

        let err = WebhookPayload::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.code(), codes::telephony::MALFORMED_WEBHOOK);
    }

    #[test]
    fn missing_call_id_is_a_protocol_error() {
        let err = WebhookPayload::default().require_call_id().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Protocol);
        assert_eq!(err.code(), codes::telephony::MISSING_CALL_ID);
    }
}
