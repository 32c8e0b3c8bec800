use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use booking_engine::{BookingConfirmation, BookingRequest};
use chrono::NaiveDate;
use error_common::{log_categorized, ErrorContext};
use schedule_store::{
    Appointment, AppointmentFilter, AppointmentStatus, BookingChannel, Language, PatientIdentity,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{api_list, api_success, ApiError, ApiResponse};
use crate::server::MediConnectServer;
use crate::telephony::PlacedCall;
use crate::validation::{is_valid_phone, parse_time, RequestValidation};
use crate::{validate_field, validate_length, validate_uuid};

const DEFAULT_LIST_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListAppointmentsParams {
    pub hospital_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    tag = "appointments",
    params(
        ("hospital_id" = Option<Uuid>, Query, description = "Filter by hospital"),
        ("doctor_id" = Option<Uuid>, Query, description = "Filter by doctor"),
        ("date" = Option<String>, Query, description = "YYYY-MM-DD"),
        ("status" = Option<String>, Query, description = "booked, confirmed, completed, cancelled, no_show or rescheduled"),
        ("limit" = Option<usize>, Query, description = "Maximum rows, default 100")
    ),
    responses(
        (status = 200, description = "Appointments, soonest first"),
        (status = 400, description = "Bad filter", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn list_appointments(
    State(server): State<MediConnectServer>,
    Query(params): Query<ListAppointmentsParams>,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<AppointmentStatus>)
        .transpose()
        .map_err(ApiError::validation)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let filter = AppointmentFilter {
        hospital_id: params.hospital_id,
        doctor_id: params.doctor_id,
        date: params.date,
        status,
        limit: Some(limit),
        ..AppointmentFilter::default()
    };
    let appointments = server.repository.list_appointments(filter).await?;
    Ok(Json(api_list(appointments, Some(limit))))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment"),
        (status = 404, description = "Unknown appointment", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn get_appointment(
    State(server): State<MediConnectServer>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Appointment>>, ApiError> {
    let appointment = server
        .repository
        .get_appointment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("appointment"))?;
    Ok(Json(api_success(appointment)))
}

/// Staff booking made at the front desk
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAppointmentRequest {
    pub hospital_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_phone: String,
    pub patient_name: Option<String>,
    pub date: NaiveDate,
    /// 24-hour HH:MM
    #[schema(example = "10:30")]
    pub time: String,
    pub symptoms: Option<String>,
    /// hi-IN or en-IN; defaults to the hospital's language
    pub language: Option<String>,
}

impl RequestValidation for CreateAppointmentRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_uuid!(self.hospital_id, "hospital_id is required");
        validate_uuid!(self.doctor_id, "doctor_id is required");
        validate_field!(
            self.patient_phone,
            is_valid_phone(&self.patient_phone),
            "patient_phone must be a 10-digit number"
        );
        if let Some(name) = &self.patient_name {
            validate_length!(name, 1, 100, "patient_name must be at most 100 characters");
        }
        if let Some(symptoms) = &self.symptoms {
            validate_length!(symptoms, 0, 500, "symptoms must be at most 500 characters");
        }
        if let Some(code) = &self.language {
            validate_field!(
                code,
                Language::from_code(code).is_some(),
                "language must be hi-IN or en-IN"
            );
        }
        parse_time(&self.time)?;
        Ok(())
    }
}

#[utoipa::path(
    post,
    path = "/api/appointments",
    tag = "appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked"),
        (status = 400, description = "Invalid request", body = crate::error::ApiErrorResponse),
        (status = 409, description = "Slot taken; details carry alternatives", body = crate::error::ApiErrorResponse),
        (status = 422, description = "Doctor does not work that day", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn create_appointment(
    State(server): State<MediConnectServer>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingConfirmation>>), ApiError> {
    request.validate()?;

    let hospital = server
        .repository
        .get_hospital(request.hospital_id)
        .await?
        .ok_or_else(|| ApiError::not_found("hospital"))?;
    let language = request
        .language
        .as_deref()
        .and_then(Language::from_code)
        .unwrap_or(hospital.default_language);

    let booking = BookingRequest {
        hospital_id: hospital.id,
        doctor_id: request.doctor_id,
        patient: PatientIdentity {
            phone: request.patient_phone.clone(),
            name: request.patient_name.clone(),
            language: Some(language),
        },
        date: request.date,
        time: parse_time(&request.time)?,
        symptoms: request.symptoms.clone(),
        language,
        channel: BookingChannel::Manual,
        call_id: None,
    };
    let confirmation = server.booking.book_appointment(booking).await?;
    Ok((StatusCode::CREATED, Json(api_success(confirmation))))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    #[schema(example = "confirmed")]
    pub status: String,
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/status",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Updated appointment"),
        (status = 400, description = "Unknown status", body = crate::error::ApiErrorResponse),
        (status = 422, description = "Transition not allowed", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn update_status(
    State(server): State<MediConnectServer>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Appointment>>, ApiError> {
    let status: AppointmentStatus = request.status.parse().map_err(ApiError::validation)?;
    let appointment = server.booking.update_status(id, status).await?;
    Ok(Json(api_success(appointment)))
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/cancel",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Cancelled appointment; its slot is open again"),
        (status = 422, description = "Already closed", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn cancel_appointment(
    State(server): State<MediConnectServer>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Appointment>>, ApiError> {
    let appointment = server.booking.cancel_appointment(id).await?;
    Ok(Json(api_success(appointment)))
}

#[derive(Debug, Serialize)]
pub struct ReminderPlaced {
    pub appointment_id: Uuid,
    pub call: PlacedCall,
}

/// Dial the patient and play an appointment reminder
#[utoipa::path(
    post,
    path = "/api/appointments/{id}/reminder",
    tag = "appointments",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 202, description = "Reminder call placed"),
        (status = 404, description = "Unknown appointment", body = crate::error::ApiErrorResponse),
        (status = 422, description = "Appointment no longer active", body = crate::error::ApiErrorResponse),
        (status = 502, description = "Telephony provider refused the call", body = crate::error::ApiErrorResponse),
        (status = 503, description = "Outbound calling not configured", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn send_reminder(
    State(server): State<MediConnectServer>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<ReminderPlaced>>), ApiError> {
    let appointment = server
        .repository
        .get_appointment(id)
        .await?
        .ok_or_else(|| ApiError::not_found("appointment"))?;
    if !appointment.status.is_active() {
        return Err(ApiError::unprocessable(format!(
            "appointment {} is {}",
            appointment.appointment_number, appointment.status
        )));
    }
    let Some(client) = server.outbound.as_ref() else {
        return Err(ApiError::service_unavailable(
            "outbound calling is not configured",
        ));
    };

    let call = client
        .make_outbound_call(
            &appointment.patient_phone,
            &server.callbacks.reminder(appointment.id),
            &server.callbacks.status_callback(),
        )
        .await
        .map_err(|e| {
            let context = ErrorContext::new()
                .with_hospital_id(appointment.hospital_id.to_string())
                .add_context("appointment", appointment.appointment_number.clone());
            log_categorized(&context, &e);
            ApiError::Upstream {
                message: e.to_string(),
            }
        })?;

    info!(
        appointment = %appointment.appointment_number,
        call_sid = %call.call_sid,
        "Reminder call placed"
    );
    Ok((
        StatusCode::ACCEPTED,
        Json(api_success(ReminderPlaced {
            appointment_id: appointment.id,
            call,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            hospital_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            patient_phone: "+91 98100 12345".into(),
            patient_name: Some("Sunita Devi".into()),
            date: NaiveDate::from_ymd_opt(2026, 2, 9).unwrap(),
            time: "10:30".into(),
            symptoms: None,
            language: Some("hi-IN".into()),
        }
    }

    #[test]
    fn well_formed_request_validates() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn bad_fields_are_rejected() {
        let mut nil_doctor = request();
        nil_doctor.doctor_id = Uuid::nil();
        assert!(nil_doctor.validate().is_err());

        let mut short_phone = request();
        short_phone.patient_phone = "98100".into();
        assert!(short_phone.validate().is_err());

        let mut odd_time = request();
        odd_time.time = "half past ten".into();
        assert!(odd_time.validate().is_err());

        let mut tamil = request();
        tamil.language = Some("ta-IN".into());
        assert!(tamil.validate().is_err());
    }
}
