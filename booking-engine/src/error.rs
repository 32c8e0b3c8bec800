use chrono::{NaiveDate, NaiveTime, Weekday};
use error_common::{codes, Categorized, ErrorCategory};
use schedule_store::StoreError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::SlotOption;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Doctor not found: {0}")]
    DoctorNotFound(Uuid),

    #[error("{doctor} does not consult on {date} ({weekday:?})")]
    NotAvailableThatDay {
        doctor: String,
        date: NaiveDate,
        weekday: Weekday,
        working_days: Vec<Weekday>,
    },

    /// The requested time was not open when checked
    #[error("Slot {date} {time} is not available")]
    SlotUnavailable {
        date: NaiveDate,
        time: NaiveTime,
        alternatives: Vec<SlotOption>,
    },

    /// The slot was open when checked but another booking committed first
    #[error("Slot {date} {time} was taken by a concurrent booking")]
    SlotConflict {
        date: NaiveDate,
        time: NaiveTime,
        alternatives: Vec<SlotOption>,
    },

    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Open times offered instead, empty for non-slot errors
    pub fn alternatives(&self) -> &[SlotOption] {
        match self {
            BookingError::SlotUnavailable { alternatives, .. }
            | BookingError::SlotConflict { alternatives, .. } => alternatives,
            _ => &[],
        }
    }

    /// Unavailable and conflict get the same caller-visible handling
    pub fn is_slot_taken(&self) -> bool {
        matches!(
            self,
            BookingError::SlotUnavailable { .. } | BookingError::SlotConflict { .. }
        )
    }
}

impl Categorized for BookingError {
    fn category(&self) -> ErrorCategory {
        match self {
            BookingError::DoctorNotFound(_)
            | BookingError::NotAvailableThatDay { .. }
            | BookingError::SlotUnavailable { .. }
            | BookingError::SlotConflict { .. } => ErrorCategory::BusinessRule,
            BookingError::InvalidRequest(_) => ErrorCategory::Input,
            BookingError::Store(e) => e.category(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            BookingError::DoctorNotFound(_) => codes::booking::DOCTOR_NOT_FOUND,
            BookingError::NotAvailableThatDay { .. } => codes::booking::NOT_AVAILABLE_THAT_DAY,
            BookingError::SlotUnavailable { .. } => codes::booking::SLOT_UNAVAILABLE,
            BookingError::SlotConflict { .. } => codes::booking::SLOT_CONFLICT,
            BookingError::InvalidRequest(_) => codes::booking::INVALID_REQUEST,
            BookingError::Store(e) => e.code(),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
