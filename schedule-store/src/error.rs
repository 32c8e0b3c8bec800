use chrono::{NaiveDate, NaiveTime};
use error_common::{codes, Categorized, ErrorCategory};
use thiserror::Error;
use uuid::Uuid;

use crate::models::AppointmentStatus;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Another non-cancelled appointment already holds the triple
    #[error("Slot already taken: doctor {doctor_id} on {date} at {time}")]
    SlotTaken {
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    },

    #[error("Invalid weekly schedule: {0}")]
    InvalidSchedule(String),

    #[error("Invalid appointment status transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Categorized for StoreError {
    fn category(&self) -> ErrorCategory {
        match self {
            StoreError::SlotTaken { .. } | StoreError::InvalidTransition { .. } => {
                ErrorCategory::BusinessRule
            }
            StoreError::NotFound { .. } | StoreError::InvalidSchedule(_) => ErrorCategory::Input,
            _ => ErrorCategory::Backend,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => codes::store::NOT_FOUND,
            StoreError::SlotTaken { .. } => codes::booking::SLOT_CONFLICT,
            StoreError::InvalidSchedule(_) => codes::store::INVALID_SCHEDULE,
            StoreError::InvalidTransition { .. } => codes::booking::INVALID_TRANSITION,
            StoreError::ConnectionFailed(_) => codes::store::CONNECTION_FAILED,
            _ => codes::store::QUERY_FAILED,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
