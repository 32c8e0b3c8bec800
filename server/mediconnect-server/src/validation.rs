//! Request validation for admin API payloads
//!
//! Handlers call [`RequestValidation::validate`] before touching the
//! booking engine, so malformed input is a 400 with a readable message
//! rather than a domain error.

use chrono::NaiveTime;
use schedule_store::normalize_phone;

use crate::error::ApiError;

/// Trait for validating request payloads
pub trait RequestValidation {
    fn validate(&self) -> Result<(), ApiError>;
}

/// Fail validation with `$message` unless `$predicate` holds
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Non-blank string field
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// Non-nil UUID field
#[macro_export]
macro_rules! validate_uuid {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, !$field.is_nil(), $message);
    };
}

/// String length within `$min..=$max` characters
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.chars().count();
        $crate::validate_field!($field, len >= $min && len <= $max, $message);
    };
}

/// Numeric value within `$min..=$max`
#[macro_export]
macro_rules! validate_range {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        $crate::validate_field!($field, $field >= $min && $field <= $max, $message);
    };
}

/// Ten digits once the country code or trunk prefix is stripped
pub fn is_valid_phone(raw: &str) -> bool {
    normalize_phone(raw).len() == 10
}

/// 24-hour `HH:MM`, seconds optional
pub fn parse_time(raw: &str) -> Result<NaiveTime, ApiError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| ApiError::validation(format!("Invalid time '{raw}', expected HH:MM")))
}
