//! Slot filling: turn a caller utterance into a reply, field updates and a
//! proposed next state.
//!
//! Backends ([`LlmNluBackend`], [`RuleBasedNlu`]) produce an unvalidated
//! [`BackendReply`]. [`NluEngine`] owns the contract on top of any backend:
//! the proposed state must come from the closed set, doctors must exist in
//! the catalog, relative dates resolve against the clinic's today, replies
//! stay short, and a failing backend becomes an apology plus a hand-off.

pub mod engine;
pub mod llm;
pub mod rules;

use async_trait::async_trait;
use booking_engine::{BookingEngine, SlotAvailability, SlotOption};
use chrono::{NaiveDate, NaiveDateTime};
use schedule_store::Language;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::DoctorCatalog;
use crate::error::{NluError, NluResult};
use crate::fields::{BookingFields, ExtractedFields, FieldUpdates};
use crate::session::ChatMessage;
use crate::state::{DialogueState, NluAction, NluState};

pub use engine::{NluConfig, NluEngine};
pub use llm::LlmNluBackend;
pub use rules::RuleBasedNlu;

/// Everything a backend may look at for one caller turn
#[derive(Debug, Clone)]
pub struct NluContext {
    pub call_id: String,
    pub language: Language,
    pub hospital_name: Option<String>,
    pub caller_number: String,
    pub utterance: String,
    /// Earlier turns, oldest first, without the current utterance
    pub history: Vec<ChatMessage>,
    pub fields: BookingFields,
    pub state: DialogueState,
    pub catalog: Arc<DoctorCatalog>,
    /// Clinic-local wall clock
    pub now: NaiveDateTime,
    /// 1-based number of this turn
    pub turn: u32,
    pub max_turns: u32,
    pub max_words: usize,
    pub last_offered: Vec<SlotOption>,
}

impl NluContext {
    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }
}

/// Raw backend output, in the JSON shape generative backends are asked for
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendReply {
    pub response_text: String,
    pub extracted_data: ExtractedFields,
    pub next_state: String,
    pub action: String,
    /// Slots read out in `response_text`, if the backend offered any
    #[serde(skip)]
    pub offered_slots: Vec<SlotOption>,
}

/// A slot-filling backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NluBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn interpret(&self, context: &NluContext) -> NluResult<BackendReply>;
}

/// Why a turn ended in a hand-off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationReason {
    CallerRequest,
    TurnLimit,
    BackendFailure,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::CallerRequest => "caller_request",
            EscalationReason::TurnLimit => "turn_limit",
            EscalationReason::BackendFailure => "backend_failure",
        }
    }
}

/// Validated result of one turn; always safe to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NluDecision {
    pub response: String,
    pub updates: FieldUpdates,
    pub next_state: NluState,
    pub action: NluAction,
    pub offered: Vec<SlotOption>,
    /// `CODE: message` when the backend failed and the reply is the apology
    pub failure: Option<String>,
    pub escalation: Option<EscalationReason>,
}

/// Open slots for offering times during the dialogue
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    async fn availability(&self, doctor_id: Uuid, date: NaiveDate) -> NluResult<SlotAvailability>;
}

#[async_trait]
impl AvailabilitySource for BookingEngine {
    async fn availability(&self, doctor_id: Uuid, date: NaiveDate) -> NluResult<SlotAvailability> {
        self.find_available_slots(doctor_id, date)
            .await
            .map_err(|e| NluError::Backend(format!("availability lookup: {e}")))
    }
}
