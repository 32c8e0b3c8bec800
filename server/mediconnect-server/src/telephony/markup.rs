//! Voice-response markup returned to the telephony provider.
//!
//! A [`VoiceResponse`] is an ordered list of verbs. Every response the
//! webhook emits must end in a verb that hands control back to us
//! (`Record`, `Gather`, `Redirect`) or ends the call (`Hangup`); the
//! provider hangs up silently on anything else.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use dialogue_engine::phrases;
use schedule_store::Language;
use std::fmt::Write as _;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Say {
        text: String,
        language: Language,
    },
    Record {
        action: String,
        max_length_secs: u32,
        timeout_secs: u32,
        finish_on_key: String,
    },
    Gather {
        action: String,
        num_digits: u32,
        timeout_secs: u32,
    },
    Redirect {
        url: String,
    },
    Hangup,
}

impl Verb {
    fn hands_back_control(&self) -> bool {
        matches!(
            self,
            Verb::Record { .. } | Verb::Gather { .. } | Verb::Redirect { .. } | Verb::Hangup
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("response has no verbs")]
    Empty,
    #[error("response ends without returning control to the webhook")]
    NoTerminalVerb,
    #[error("verbs follow a hangup")]
    VerbsAfterHangup,
}

/// Text-to-speech voice for a language
pub fn voice_for(language: Language) -> &'static str {
    match language {
        Language::Hindi => "Aditi",
        Language::English => "Raveena",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>, language: Language) -> Self {
        self.verbs.push(Verb::Say {
            text: text.into(),
            language,
        });
        self
    }

    pub fn record(
        mut self,
        action: impl Into<String>,
        max_length_secs: u32,
        timeout_secs: u32,
        finish_on_key: impl Into<String>,
    ) -> Self {
        self.verbs.push(Verb::Record {
            action: action.into(),
            max_length_secs,
            timeout_secs,
            finish_on_key: finish_on_key.into(),
        });
        self
    }

    pub fn gather(mut self, action: impl Into<String>, num_digits: u32, timeout_secs: u32) -> Self {
        self.verbs.push(Verb::Gather {
            action: action.into(),
            num_digits,
            timeout_secs,
        });
        self
    }

    pub fn redirect(mut self, url: impl Into<String>) -> Self {
        self.verbs.push(Verb::Redirect { url: url.into() });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.verbs.push(Verb::Hangup);
        self
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn ends_call(&self) -> bool {
        matches!(self.verbs.last(), Some(Verb::Hangup))
    }

    /// Text of every `Say`, in order
    pub fn spoken(&self) -> Vec<&str> {
        self.verbs
            .iter()
            .filter_map(|v| match v {
                Verb::Say { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), MarkupError> {
        let last = self.verbs.last().ok_or(MarkupError::Empty)?;
        if !last.hands_back_control() {
            return Err(MarkupError::NoTerminalVerb);
        }
        if let Some(pos) = self.verbs.iter().position(|v| *v == Verb::Hangup) {
            if pos + 1 != self.verbs.len() {
                return Err(MarkupError::VerbsAfterHangup);
            }
        }
        Ok(())
    }

    /// Apology and hangup, used when nothing better can be said
    pub fn technical_difficulties() -> Self {
        Self::new()
            .say(phrases::TECHNICAL_DIFFICULTIES, Language::English)
            .hangup()
    }

    pub fn render(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n");
        for verb in &self.verbs {
            let _ = match verb {
                Verb::Say { text, language } => writeln!(
                    xml,
                    "  <Say voice=\"{}\" language=\"{}\">{}</Say>",
                    voice_for(*language),
                    language.code(),
                    escape(text)
                ),
                Verb::Record {
                    action,
                    max_length_secs,
                    timeout_secs,
                    finish_on_key,
                } => writeln!(
                    xml,
                    "  <Record action=\"{}\" method=\"POST\" maxLength=\"{}\" timeout=\"{}\" finishOnKey=\"{}\" playBeep=\"false\"/>",
                    escape(action),
                    max_length_secs,
                    timeout_secs,
                    escape(finish_on_key)
                ),
                Verb::Gather {
                    action,
                    num_digits,
                    timeout_secs,
                } => writeln!(
                    xml,
                    "  <Gather action=\"{}\" method=\"POST\" numDigits=\"{}\" timeout=\"{}\"/>",
                    escape(action),
                    num_digits,
                    timeout_secs
                ),
                Verb::Redirect { url } => {
                    writeln!(xml, "  <Redirect method=\"POST\">{}</Redirect>", escape(url))
                }
                Verb::Hangup => writeln!(xml, "  <Hangup/>"),
            };
        }
        xml.push_str("</Response>\n");
        xml
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

impl IntoResponse for VoiceResponse {
    fn into_response(self) -> Response {
        let body = match self.validate() {
            Ok(()) => self.render(),
            Err(err) => {
                error!(error = %err, verbs = self.verbs.len(), "Refusing to emit invalid voice markup");
                VoiceResponse::technical_difficulties().render()
            }
        };
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            body,
        )
            .into_response()
    }
}
