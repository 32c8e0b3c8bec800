//! Generative backend over an OpenAI-compatible chat completions endpoint.

use async_trait::async_trait;
use config_engine::NluSettings;
use schedule_store::Language;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::debug;

use crate::error::{NluError, NluResult};
use crate::nlu::{BackendReply, NluBackend, NluContext};
use crate::phrases::spoken_time;
use crate::session::ChatRole;

pub struct LlmNluBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: std::borrow::Cow<'a, str>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl LlmNluBackend {
    pub fn from_settings(settings: &NluSettings) -> NluResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NluError::Misconfigured("nlu.api_key is not set".to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: settings.endpoint.clone(),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    fn request<'a>(&'a self, ctx: &'a NluContext) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(ctx.history.len() + 2);
        messages.push(RequestMessage {
            role: "system",
            content: system_prompt(ctx).into(),
        });
        messages.extend(ctx.history.iter().map(|m| RequestMessage {
            role: match m.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            content: m.content.as_str().into(),
        }));
        messages.push(RequestMessage {
            role: "user",
            content: ctx.utterance.as_str().into(),
        });

        ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

fn language_instruction(language: Language) -> &'static str {
    match language {
        Language::Hindi => {
            "Reply only in Hindi, in Devanagari script, politely, like a helpful hospital receptionist."
        }
        Language::English => {
            "Reply in English, politely, like a helpful hospital receptionist."
        }
    }
}

/// Instructions, catalog and call state for the generative backend
pub fn system_prompt(ctx: &NluContext) -> String {
    let today = ctx.today();
    let collected = serde_json::to_string_pretty(&ctx.fields).unwrap_or_else(|_| "{}".to_string());
    let hospital = ctx.hospital_name.as_deref().unwrap_or("the hospital");

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are MediConnect, the telephone appointment assistant of {hospital}. \
         Callers speak to you over a phone line and hear your reply as speech."
    );
    let _ = writeln!(prompt, "\n{}\n", language_instruction(ctx.language));
    let _ = writeln!(prompt, "TODAY: {}", today.format("%Y-%m-%d (%A)"));
    let _ = writeln!(
        prompt,
        "CURRENT TIME: {}",
        spoken_time(ctx.now.time(), Language::English)
    );
    let _ = writeln!(prompt, "\nDOCTORS YOU MAY OFFER:\n{}", ctx.catalog.prompt_json());
    let _ = writeln!(prompt, "\nCURRENT STATE: {}", ctx.state);
    let _ = writeln!(prompt, "COLLECTED SO FAR:\n{collected}");
    let _ = writeln!(prompt, "CALLER PHONE: {}", ctx.caller_number);
    if !ctx.last_offered.is_empty() {
        let offered = ctx
            .last_offered
            .iter()
            .map(|s| format!("{} {}", s.date.format("%Y-%m-%d"), s.time.format("%H:%M")))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(prompt, "SLOTS YOU JUST OFFERED: {offered}");
    }
    let _ = writeln!(prompt, "TURN: {} of {}", ctx.turn, ctx.max_turns);

    let _ = write!(
        prompt,
        r#"
Work out what the caller needs (a new booking, a cancellation, or a hand-off to staff).
Collect the department or doctor, the date, the time and the patient's name.
Read the full booking back and wait for a yes before booking.

Answer with one JSON object:
{{
  "response_text": "what you say to the caller",
  "extracted_data": {{"patientName": "", "department": "", "doctorName": "", "doctorId": "", "preferredDate": "YYYY-MM-DD", "preferredTime": "HH:MM", "symptoms": ""}},
  "next_state": "collecting_info|confirming|booked|transfer_to_human|ended",
  "action": "none|book_appointment|cancel_appointment|transfer_to_human"
}}
Leave out extracted_data keys you did not learn this turn.

RULES:
- Only name doctors from the list above; copy doctorId from it.
- If the hospital has no such department, say so and list the ones it has.
- Keep response_text under {max_words} words.
- After {max_turns} turns without a booking, offer to transfer to the reception.
- "aaj" is today, "kal" is tomorrow, "parso" is the day after tomorrow.
- preferredDate is YYYY-MM-DD and preferredTime is 24-hour HH:MM.
- Use only the next_state values listed above."#,
        max_words = ctx.max_words,
        max_turns = ctx.max_turns,
    );
    prompt
}

/// Pull the reply object out of the first choice
fn parse_reply(response: ChatResponse) -> NluResult<BackendReply> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| NluError::MalformedOutput("no choices in completion".to_string()))?;

    // Some models wrap JSON in a fenced block despite the response format
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    Ok(serde_json::from_str(trimmed)?)
}

#[async_trait]
impl NluBackend for LlmNluBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn interpret(&self, ctx: &NluContext) -> NluResult<BackendReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(ctx))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NluError::Backend(format!(
                "{status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let reply = parse_reply(response.json::<ChatResponse>().await?)?;
        debug!(
            call_id = %ctx.call_id,
            model = %self.model,
            next_state = %reply.next_state,
            action = %reply.action,
            "Completion parsed"
        );
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DoctorCatalog;
    use crate::fields::BookingFields;
    use crate::state::DialogueState;
    use chrono::{NaiveDate, NaiveTime};
    use schedule_store::demo;
    use std::sync::Arc;
    use uuid::Uuid;

    fn context() -> NluContext {
        NluContext {
            call_id: "CA9".into(),
            language: Language::Hindi,
            hospital_name: Some("City Care Hospital".into()),
            caller_number: "9876543210".into(),
            utterance: "kal dil ke doctor".into(),
            history: Vec::new(),
            fields: BookingFields::default(),
            state: DialogueState::Listening,
            catalog: Arc::new(DoctorCatalog::new(
                demo::city_care_doctors(Uuid::new_v4()).unwrap(),
            )),
            now: NaiveDate::from_ymd_opt(2026, 2, 8)
                .unwrap()
                .and_time(NaiveTime::from_hms_opt(20, 0, 0).unwrap()),
            turn: 1,
            max_turns: 6,
            max_words: 50,
            last_offered: Vec::new(),
        }
    }

    #[test]
    fn prompt_carries_date_catalog_and_rules() {
        let prompt = system_prompt(&context());
        assert!(prompt.contains("TODAY: 2026-02-08 (Sunday)"));
        assert!(prompt.contains("Dr. Priya Patel"));
        assert!(prompt.contains("Devanagari"));
        assert!(prompt.contains("under 50 words"));
        assert!(prompt.contains("\"kal\" is tomorrow"));
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = LlmNluBackend::from_settings(&NluSettings::default()).err().unwrap();
        assert!(matches!(err, NluError::Misconfigured(_)));
    }

    #[test]
    fn request_ends_with_the_current_utterance() {
        let settings = NluSettings {
            api_key: Some("sk-test".into()),
            ..NluSettings::default()
        };
        let backend = LlmNluBackend::from_settings(&settings).unwrap();
        let ctx = context();
        let body = serde_json::to_value(backend.request(&ctx)).unwrap();

        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "kal dil ke doctor");
    }

    #[test]
    fn completion_content_becomes_a_reply() {
        let raw = r#"{"choices":[{"message":{"content":"```json\n{\"response_text\":\"कल किस समय?\",\"extracted_data\":{\"department\":\"cardiology\",\"preferredDate\":\"kal\"},\"next_state\":\"collecting_info\",\"action\":\"none\"}\n```"}}]}"#;
        let response: ChatResponse = serde_json::from_str(raw).unwrap();
        let reply = parse_reply(response).unwrap();

        assert_eq!(reply.next_state, "collecting_info");
        assert_eq!(reply.extracted_data.department.as_deref(), Some("cardiology"));
        assert_eq!(reply.extracted_data.preferred_date.as_deref(), Some("kal"));
    }

    #[test]
    fn empty_completion_is_malformed() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(parse_reply(response), Err(NluError::MalformedOutput(_))));
    }
}
