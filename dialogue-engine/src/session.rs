use booking_engine::SlotOption;
use chrono::{DateTime, Utc};
use schedule_store::{normalize_phone, Language};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fields::BookingFields;
use crate::nlu::NluDecision;
use crate::state::DialogueState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One line of the running dialogue, oldest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// What is known about a call when its session is first created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSeed {
    pub call_id: String,
    pub hospital_id: Option<Uuid>,
    pub hospital_name: Option<String>,
    pub caller_number: String,
    pub language: Language,
}

/// Per-call dialogue state, owned by the call that created it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueSession {
    pub call_id: String,
    pub hospital_id: Option<Uuid>,
    pub hospital_name: Option<String>,
    /// Normalised caller number
    pub caller_number: String,
    pub language: Language,
    pub state: DialogueState,
    pub fields: BookingFields,
    /// Caller turns handed to the slot filler so far
    pub turn_count: u32,
    /// Consecutive recordings with no usable speech
    pub no_speech_count: u32,
    /// Unusable language-menu key presses
    pub digit_retries: u32,
    pub history: Vec<ChatMessage>,
    /// Slots most recently read out to the caller, first one first
    pub last_offered: Vec<SlotOption>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DialogueSession {
    pub fn new(seed: SessionSeed) -> Self {
        let now = Utc::now();
        let caller_number = normalize_phone(&seed.caller_number);
        let fields = BookingFields {
            patient_phone: (!caller_number.is_empty()).then(|| caller_number.clone()),
            ..BookingFields::default()
        };
        Self {
            call_id: seed.call_id,
            hospital_id: seed.hospital_id,
            hospital_name: seed.hospital_name,
            caller_number,
            language: seed.language,
            state: DialogueState::Incoming,
            fields,
            turn_count: 0,
            no_speech_count: 0,
            digit_retries: 0,
            history: Vec::new(),
            last_offered: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, state: DialogueState) {
        if self.state != state {
            tracing::debug!(
                call_id = %self.call_id,
                from = %self.state,
                to = %state,
                "Dialogue state change"
            );
        }
        self.state = state;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Count an empty recording; returns the running total
    pub fn record_no_speech(&mut self) -> u32 {
        self.no_speech_count = self.no_speech_count.saturating_add(1);
        self.touch();
        self.no_speech_count
    }

    /// Fold one interpreted caller turn into the session
    pub fn apply_turn(&mut self, utterance: &str, decision: &NluDecision) {
        self.turn_count = self.turn_count.saturating_add(1);
        self.no_speech_count = 0;
        self.fields.merge(decision.updates.clone());
        self.history.push(ChatMessage {
            role: ChatRole::User,
            content: utterance.to_string(),
        });
        self.history.push(ChatMessage {
            role: ChatRole::Assistant,
            content: decision.response.clone(),
        });
        if !decision.offered.is_empty() || decision.updates.preferred_time.is_some() {
            self.last_offered.clone_from(&decision.offered);
        }
        self.transition(decision.next_state.into());
    }

    /// Record a reply spoken outside the slot filler, such as a booking result
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.history.push(ChatMessage {
            role: ChatRole::Assistant,
            content: content.into(),
        });
        self.touch();
    }

    /// Snapshot of the collected fields for the conversation record
    pub fn collected_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.fields).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldUpdates;
    use crate::state::{NluAction, NluState};
    use chrono::{NaiveDate, NaiveTime};

    fn seed() -> SessionSeed {
        SessionSeed {
            call_id: "CA100".into(),
            hospital_id: None,
            hospital_name: Some("City Care Hospital".into()),
            caller_number: "+91 98765 43210".into(),
            language: Language::Hindi,
        }
    }

    #[test]
    fn new_session_knows_the_caller_number() {
        let session = DialogueSession::new(seed());
        assert_eq!(session.caller_number, "9876543210");
        assert_eq!(session.fields.patient_phone.as_deref(), Some("9876543210"));
        assert_eq!(session.state, DialogueState::Incoming);
    }

    #[test]
    fn applying_a_turn_updates_history_fields_and_state() {
        let mut session = DialogueSession::new(seed());
        session.no_speech_count = 2;
        let offered = vec![SlotOption {
            date: NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        }];
        let decision = NluDecision {
            response: "कल 10 बजे खाली है".into(),
            updates: FieldUpdates {
                preferred_date: NaiveDate::from_ymd_opt(2026, 2, 9),
                ..FieldUpdates::default()
            },
            next_state: NluState::Collecting,
            action: NluAction::None,
            offered: offered.clone(),
            failure: None,
            escalation: None,
        };

        session.apply_turn("kal", &decision);

        assert_eq!(session.turn_count, 1);
        assert_eq!(session.no_speech_count, 0);
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.last_offered, offered);
        assert_eq!(session.state, DialogueState::Collecting);
        assert_eq!(session.fields.preferred_date, NaiveDate::from_ymd_opt(2026, 2, 9));
    }

    #[test]
    fn sessions_survive_json_round_trip() {
        let session = DialogueSession::new(seed());
        let json = serde_json::to_string(&session).unwrap();
        let back: DialogueSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
