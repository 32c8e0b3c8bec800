use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use booking_engine::BookingError;
use error_common::Categorized;
use schedule_store::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard API error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error type
    pub error_type: String,
    /// Stable domain error code, when the failure came from a domain crate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Field-specific validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<HashMap<String, Vec<String>>>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Suggested actions for resolving the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Standard API success response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field_errors: Option<HashMap<String, Vec<String>>>,
    },

    #[error("Resource not found: {resource_type}")]
    NotFound { resource_type: String },

    #[error("Resource conflict: {message}")]
    Conflict { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("Unprocessable entity: {message}")]
    UnprocessableEntity { message: String },

    #[error("Upstream provider error: {message}")]
    Upstream { message: String },
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::SlotTaken { .. } | StoreError::Duplicate(_) => StatusCode::CONFLICT,
        StoreError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::InvalidSchedule(_) => StatusCode::BAD_REQUEST,
        StoreError::ConnectionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::QueryFailed(_)
        | StoreError::Corrupt(_)
        | StoreError::MigrationError(_)
        | StoreError::SqlxError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn validation_with_fields(
        message: impl Into<String>,
        field_errors: HashMap<String, Vec<String>>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: Some(field_errors),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn not_found(resource_type: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::UnprocessableEntity {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Store(err) => store_status(err),
            ApiError::Booking(err) => match err {
                BookingError::DoctorNotFound(_) => StatusCode::NOT_FOUND,
                BookingError::NotAvailableThatDay { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                BookingError::SlotUnavailable { .. } | BookingError::SlotConflict { .. } => {
                    StatusCode::CONFLICT
                }
                BookingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                BookingError::Store(store) => store_status(store),
            },
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation_error",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::Store(_) => "store_error",
            ApiError::Booking(_) => "booking_error",
            ApiError::Internal { .. } => "internal_error",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::UnprocessableEntity { .. } => "unprocessable_entity",
            ApiError::Upstream { .. } => "upstream_error",
        }
    }

    /// Stable code of the underlying domain error
    pub fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Store(err) => Some(err.code()),
            ApiError::Booking(err) => Some(err.code()),
            _ => None,
        }
    }

    pub fn suggestions(&self) -> Option<Vec<String>> {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest { .. } => Some(vec![
                "Check the request payload for invalid fields".to_string(),
                "Dates are YYYY-MM-DD and times are 24-hour HH:MM".to_string(),
            ]),
            ApiError::NotFound { .. } => Some(vec![
                "Verify the resource ID is correct".to_string(),
            ]),
            ApiError::Booking(err) if err.is_slot_taken() => Some(vec![
                "Pick one of the alternative slots in details".to_string(),
            ]),
            ApiError::Booking(BookingError::NotAvailableThatDay { .. }) => Some(vec![
                "Choose a date on one of the doctor's working days".to_string(),
            ]),
            ApiError::Store(StoreError::InvalidTransition { .. }) => Some(vec![
                "Appointments move booked -> confirmed -> completed, or to cancelled/no_show/rescheduled while active"
                    .to_string(),
            ]),
            ApiError::ServiceUnavailable { .. } => Some(vec![
                "Try again in a few moments".to_string(),
            ]),
            _ => None,
        }
    }

    /// Caller-facing message; store internals stay in the logs
    fn public_message(&self) -> String {
        match self {
            ApiError::Store(err) | ApiError::Booking(BookingError::Store(err)) => {
                match store_status(err) {
                    StatusCode::INTERNAL_SERVER_ERROR => {
                        "The schedule store failed to complete the operation.".to_string()
                    }
                    StatusCode::SERVICE_UNAVAILABLE => {
                        "The schedule store is unavailable.".to_string()
                    }
                    _ => err.to_string(),
                }
            }
            ApiError::Booking(err) => err.to_string(),
            _ => self.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Booking(err) if err.is_slot_taken() => Some(serde_json::json!({
                "alternatives": err.alternatives(),
            })),
            ApiError::Booking(BookingError::NotAvailableThatDay { working_days, .. }) => {
                Some(serde_json::json!({
                    "working_days": working_days.iter().map(ToString::to_string).collect::<Vec<_>>(),
                }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();

        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %self,
                "API request rejected"
            );
        }

        let field_errors = match &self {
            ApiError::Validation { field_errors, .. } => field_errors.clone(),
            _ => None,
        };

        let error_response = ApiErrorResponse {
            error_id,
            error_type: self.error_type().to_string(),
            code: self.code().map(str::to_string),
            message: self.public_message(),
            details: self.details(),
            field_errors,
            timestamp: chrono::Utc::now(),
            suggestions: self.suggestions(),
        };

        (status_code, Json(error_response)).into_response()
    }
}

pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: None,
    }
}

pub fn api_success_with_meta<T>(data: T, metadata: ResponseMetadata) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data,
        metadata: Some(metadata),
    }
}

/// Wrap a list with its length and the limit that produced it
pub fn api_list<T>(items: Vec<T>, limit: Option<usize>) -> ApiResponse<Vec<T>> {
    let metadata = ResponseMetadata {
        total_count: Some(items.len() as u64),
        limit,
    };
    api_success_with_meta(items, metadata)
}
