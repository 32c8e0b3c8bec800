// Persistent call records
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    InProgress,
    Completed,
    Failed,
    Abandoned,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::InProgress => "in_progress",
            ConversationStatus::Completed => "completed",
            ConversationStatus::Failed => "failed",
            ConversationStatus::Abandoned => "abandoned",
        }
    }

    /// Map the provider's terminal call status onto ours
    pub fn from_provider_status(status: Option<&str>) -> Self {
        match status.map(str::to_ascii_lowercase).as_deref() {
            Some("failed") => ConversationStatus::Failed,
            Some("busy" | "no-answer" | "no_answer" | "canceled" | "cancelled") => {
                ConversationStatus::Abandoned
            }
            _ => ConversationStatus::Completed,
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ConversationStatus::InProgress),
            "completed" => Ok(ConversationStatus::Completed),
            "failed" => Ok(ConversationStatus::Failed),
            "abandoned" => Ok(ConversationStatus::Abandoned),
            other => Err(format!("unknown conversation status: {other}")),
        }
    }
}

/// One caller utterance and the reply spoken back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub utterance: String,
    pub response: String,
    /// Dialogue state after the turn
    pub state: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationOutcome {
    pub booking_successful: bool,
    pub appointment_id: Option<Uuid>,
    pub escalated: bool,
    pub escalation_reason: Option<String>,
    /// Error code plus message of the failure that ended the dialogue, if any
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallBilling {
    pub billable: bool,
    /// Whole rupees, copied from the hospital's per-call rate
    pub amount: i64,
    pub currency: String,
    pub billed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub call_id: String,
    pub hospital_id: Option<Uuid>,
    pub hospital_name: Option<String>,
    /// Normalised caller number
    pub caller_number: String,
    pub dialed_number: Option<String>,
    pub language: Option<Language>,
    pub state: String,
    pub turns: Vec<ConversationTurn>,
    /// Booking fields collected so far, as the dialogue engine last saw them
    pub collected: serde_json::Value,
    pub outcome: ConversationOutcome,
    pub status: ConversationStatus,
    pub provider_status: Option<String>,
    pub duration_secs: Option<u32>,
    pub billing: CallBilling,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub call_id: String,
    pub hospital_id: Option<Uuid>,
    pub hospital_name: Option<String>,
    pub caller_number: String,
    pub dialed_number: Option<String>,
    pub state: String,
    pub billing_amount: i64,
    pub currency: String,
}

/// Outcome fields written after a turn; `None` leaves the stored value alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeUpdate {
    pub state: Option<String>,
    pub collected: Option<serde_json::Value>,
    pub appointment_id: Option<Uuid>,
    pub booking_successful: Option<bool>,
    pub escalation_reason: Option<String>,
    pub error: Option<String>,
}

impl OutcomeUpdate {
    pub fn escalated(state: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            escalation_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, conversation: &mut Conversation) {
        if let Some(state) = self.state {
            conversation.state = state;
        }
        if let Some(collected) = self.collected {
            conversation.collected = collected;
        }
        if let Some(id) = self.appointment_id {
            conversation.outcome.appointment_id = Some(id);
        }
        if let Some(booked) = self.booking_successful {
            conversation.outcome.booking_successful = booked;
        }
        if let Some(reason) = self.escalation_reason {
            conversation.outcome.escalated = true;
            conversation.outcome.escalation_reason = Some(reason);
        }
        if let Some(error) = self.error {
            conversation.outcome.error = Some(error);
        }
        conversation.updated_at = Utc::now();
    }
}

/// Terminal call facts from the provider's status callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallCompletion {
    pub provider_status: Option<String>,
    pub duration_secs: Option<u32>,
    pub ended_at: DateTime<Utc>,
}

impl CallCompletion {
    pub(crate) fn apply(self, conversation: &mut Conversation) {
        conversation.status =
            ConversationStatus::from_provider_status(self.provider_status.as_deref());
        // Falls back to wall-clock duration when the provider omits it
        let measured = (self.ended_at - conversation.started_at).num_seconds().max(0);
        conversation.duration_secs = self
            .duration_secs
            .or_else(|| u32::try_from(measured).ok());
        conversation.provider_status = self.provider_status;
        conversation.ended_at = Some(self.ended_at);
        conversation.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_status_mapping() {
        assert_eq!(
            ConversationStatus::from_provider_status(Some("completed")),
            ConversationStatus::Completed
        );
        assert_eq!(
            ConversationStatus::from_provider_status(Some("no-answer")),
            ConversationStatus::Abandoned
        );
        assert_eq!(
            ConversationStatus::from_provider_status(Some("FAILED")),
            ConversationStatus::Failed
        );
        assert_eq!(
            ConversationStatus::from_provider_status(None),
            ConversationStatus::Completed
        );
    }
}
