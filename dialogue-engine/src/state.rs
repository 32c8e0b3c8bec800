use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NluError;

/// Where a call is in the booking dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    Incoming,
    LanguageSelect,
    Greeting,
    Listening,
    Collecting,
    Confirming,
    Booked,
    Escalated,
    Ended,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueState::Incoming => "incoming",
            DialogueState::LanguageSelect => "language_select",
            DialogueState::Greeting => "greeting",
            DialogueState::Listening => "listening",
            DialogueState::Collecting => "collecting",
            DialogueState::Confirming => "confirming",
            DialogueState::Booked => "booked",
            DialogueState::Escalated => "escalated",
            DialogueState::Ended => "ended",
        }
    }

    /// The call is hung up after the closing message; no more recordings
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DialogueState::Booked | DialogueState::Escalated | DialogueState::Ended
        )
    }

    /// States in which a caller utterance is expected
    pub fn accepts_speech(&self) -> bool {
        matches!(
            self,
            DialogueState::Greeting
                | DialogueState::Listening
                | DialogueState::Collecting
                | DialogueState::Confirming
        )
    }
}

impl fmt::Display for DialogueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialogueState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use DialogueState::*;
        [
            Incoming,
            LanguageSelect,
            Greeting,
            Listening,
            Collecting,
            Confirming,
            Booked,
            Escalated,
            Ended,
        ]
        .into_iter()
        .find(|state| state.as_str() == s)
        .ok_or_else(|| format!("unknown dialogue state: {s}"))
    }
}

/// The states a slot-filling backend may propose after a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NluState {
    Collecting,
    Confirming,
    Booked,
    Escalated,
    Ended,
}

impl NluState {
    /// Map a backend-supplied state name through the closed alias table.
    ///
    /// Names outside the table are rejected, never guessed at.
    pub fn parse(raw: &str) -> Result<Self, NluError> {
        let name = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let state = match name.as_str() {
            "collecting" | "collecting_info" | "collect" | "greeting" | "listening" => {
                NluState::Collecting
            }
            "confirming" | "confirm" | "confirmation" => NluState::Confirming,
            "booked" | "booking" | "booking_confirmed" => NluState::Booked,
            "escalated" | "transfer" | "transfer_to_human" | "human" | "handoff" => {
                NluState::Escalated
            }
            "ended" | "end" | "goodbye" | "completed" => NluState::Ended,
            _ => return Err(NluError::InvalidState(raw.to_string())),
        };
        Ok(state)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NluState::Booked | NluState::Escalated | NluState::Ended)
    }
}

impl From<NluState> for DialogueState {
    fn from(state: NluState) -> Self {
        match state {
            NluState::Collecting => DialogueState::Collecting,
            NluState::Confirming => DialogueState::Confirming,
            NluState::Booked => DialogueState::Booked,
            NluState::Escalated => DialogueState::Escalated,
            NluState::Ended => DialogueState::Ended,
        }
    }
}

/// What the protocol handler should do besides speaking the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NluAction {
    None,
    BookAppointment,
    CancelAppointment,
    TransferToHuman,
}

impl NluAction {
    pub fn parse(raw: &str) -> Result<Self, NluError> {
        let name = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let action = match name.as_str() {
            "" | "none" | "null" | "no_action" => NluAction::None,
            "book_appointment" | "book" => NluAction::BookAppointment,
            "cancel_appointment" | "cancel" => NluAction::CancelAppointment,
            "transfer_to_human" | "transfer" | "escalate" => NluAction::TransferToHuman,
            _ => return Err(NluError::MalformedOutput(format!("unknown action '{raw}'"))),
        };
        Ok(action)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NluAction::None => "none",
            NluAction::BookAppointment => "book_appointment",
            NluAction::CancelAppointment => "cancel_appointment",
            NluAction::TransferToHuman => "transfer_to_human",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_into_the_closed_set() {
        assert_eq!(NluState::parse("collecting_info").unwrap(), NluState::Collecting);
        assert_eq!(NluState::parse("Confirming").unwrap(), NluState::Confirming);
        assert_eq!(NluState::parse("transfer-to-human").unwrap(), NluState::Escalated);
        assert_eq!(NluState::parse(" goodbye ").unwrap(), NluState::Ended);
    }

    #[test]
    fn unknown_state_names_are_rejected() {
        for raw in ["error", "payment", "", "booked!"] {
            assert!(matches!(
                NluState::parse(raw),
                Err(NluError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn actions_parse_and_unknown_is_malformed() {
        assert_eq!(NluAction::parse("book_appointment").unwrap(), NluAction::BookAppointment);
        assert_eq!(NluAction::parse("").unwrap(), NluAction::None);
        assert!(matches!(
            NluAction::parse("send_sms"),
            Err(NluError::MalformedOutput(_))
        ));
    }

    #[test]
    fn dialogue_state_round_trips_through_its_name() {
        for state in [
            DialogueState::LanguageSelect,
            DialogueState::Confirming,
            DialogueState::Escalated,
        ] {
            assert_eq!(state.as_str().parse::<DialogueState>().unwrap(), state);
        }
        assert!(DialogueState::Booked.is_terminal());
        assert!(!DialogueState::Listening.is_terminal());
    }
}
