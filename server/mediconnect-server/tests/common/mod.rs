#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use booking_engine::FixedClock;
use chrono::{NaiveDate, NaiveTime};
use config_engine::MediConnectConfig;
use dialogue_engine::InMemorySessionStore;
use mediconnect_server::{create_app, MediConnectServer, ServerComponents};
use schedule_store::{demo, InMemoryScheduleRepository, Language};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use voice_recognition_service::{Transcriber, Transcript, VoiceResult};

/// Transcribes recording URLs from a script; unknown URLs are silence
#[derive(Default)]
pub struct ScriptedTranscriber {
    lines: Mutex<HashMap<String, (String, Duration)>>,
}

impl ScriptedTranscriber {
    pub fn script(&self, url: &str, text: &str) {
        self.script_slow(url, text, Duration::ZERO);
    }

    /// Like [`script`](Self::script), with recognition taking `delay`
    pub fn script_slow(&self, url: &str, text: &str, delay: Duration) {
        self.lines
            .lock()
            .unwrap()
            .insert(url.to_string(), (text.to_string(), delay));
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe_recording(
        &self,
        recording_url: &str,
        _language: Language,
        _alternates: &[Language],
    ) -> VoiceResult<Transcript> {
        let (text, delay) = self
            .lines
            .lock()
            .unwrap()
            .get(recording_url)
            .cloned()
            .unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(Transcript::from_text(text))
    }
}

pub struct Harness {
    pub app: Router,
    pub server: MediConnectServer,
    pub repo: Arc<InMemoryScheduleRepository>,
    pub sessions: Arc<InMemorySessionStore>,
    pub transcriber: Arc<ScriptedTranscriber>,
    pub tenant: demo::DemoTenant,
    recordings: AtomicUsize,
}

pub fn sunday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 8).unwrap()
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
}

pub fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Demo hospital, rule-based NLU, Sunday 8 February 2026 at 20:00 clinic time
pub async fn harness() -> Harness {
    harness_with(None).await
}

/// Same as [`harness`], with speech recognised by `speech` instead of the script
pub async fn harness_with(speech: Option<Arc<dyn Transcriber>>) -> Harness {
    harness_configured(MediConnectConfig::default(), speech).await
}

pub async fn harness_configured(
    config: MediConnectConfig,
    speech: Option<Arc<dyn Transcriber>>,
) -> Harness {
    let repo = Arc::new(InMemoryScheduleRepository::new());
    let tenant = demo::seed(repo.as_ref()).await.unwrap();
    let sessions = Arc::new(InMemorySessionStore::new());
    let transcriber = Arc::new(ScriptedTranscriber::default());
    let speech: Arc<dyn Transcriber> = match speech {
        Some(speech) => speech,
        None => transcriber.clone(),
    };

    let server = MediConnectServer::assemble(
        config,
        ServerComponents {
            repository: repo.clone(),
            clock: Arc::new(FixedClock::at(sunday(), at(20, 0))),
            backend: None,
            sessions: sessions.clone(),
            transcriber: speech,
        },
    );

    Harness {
        app: create_app(server.clone()),
        server,
        repo,
        sessions,
        transcriber,
        tenant,
        recordings: AtomicUsize::new(0),
    }
}

impl Harness {
    /// POST a form-encoded webhook; returns status and body text
    pub async fn webhook(&self, path: &str, fields: &[(&str, &str)]) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(serde_urlencoded::to_string(fields).unwrap()))
            .unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    /// Incoming call on the demo number, then a language key press
    pub async fn answer(&self, call_id: &str, caller: &str, digit: &str) -> String {
        let (status, menu) = self
            .webhook(
                "/api/voice/incoming",
                &[
                    ("CallSid", call_id),
                    ("From", caller),
                    ("To", demo::DEMO_INBOUND_NUMBER),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(menu.contains("<Gather"), "{menu}");

        let (status, greeting) = self
            .webhook(
                "/api/voice/language-selected",
                &[("CallSid", call_id), ("Digits", digit)],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        greeting
    }

    /// The caller says `text`; returns the reply markup
    pub async fn say(&self, call_id: &str, text: &str) -> String {
        self.say_slowly(call_id, text, Duration::ZERO).await
    }

    /// Like [`say`](Self::say), with recognition of this recording taking `delay`
    pub async fn say_slowly(&self, call_id: &str, text: &str, delay: Duration) -> String {
        let n = self.recordings.fetch_add(1, Ordering::SeqCst);
        let url = format!("https://recordings.test/{call_id}/{n}.mp3");
        self.transcriber.script_slow(&url, text, delay);
        let (status, xml) = self
            .webhook(
                "/api/voice/process-speech",
                &[("CallSid", call_id), ("RecordingUrl", url.as_str())],
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        xml
    }

    pub async fn get_json(&self, path: &str) -> (StatusCode, serde_json::Value) {
        self.json_request("GET", path, None).await
    }

    pub async fn json_request(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(path);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }
}

/// Provider's call-status callback for a finished call
pub async fn hang_up(h: &Harness, call_id: &str) {
    let (status, body) = h
        .webhook(
            "/api/voice/status-callback",
            &[("CallSid", call_id), ("Status", "completed"), ("Duration", "30")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"success\":true"), "{body}");
}

pub fn ends_call(xml: &str) -> bool {
    xml.contains("<Hangup/>\n</Response>")
}

pub fn keeps_listening(xml: &str) -> bool {
    xml.contains("<Record ") && !xml.contains("<Hangup/>")
}
