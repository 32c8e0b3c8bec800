use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Call-scoped context attached to a logged failure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub call_id: Option<String>,
    pub hospital_id: Option<String>,
    pub turn: Option<u32>,
    pub additional: HashMap<String, String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    pub fn with_hospital_id(mut self, hospital_id: impl Into<String>) -> Self {
        self.hospital_id = Some(hospital_id.into());
        self
    }

    pub fn with_turn(mut self, turn: u32) -> Self {
        self.turn = Some(turn);
        self
    }

    pub fn add_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call={}", self.call_id.as_deref().unwrap_or("-"))?;
        if let Some(hospital) = &self.hospital_id {
            write!(f, " hospital={hospital}")?;
        }
        if let Some(turn) = self.turn {
            write!(f, " turn={turn}")?;
        }
        let mut extra: Vec<_> = self.additional.iter().collect();
        extra.sort();
        for (key, value) in extra {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}
