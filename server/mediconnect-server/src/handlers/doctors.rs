use axum::{
    extract::{Path, Query, State},
    Json,
};
use booking_engine::SlotAvailability;
use chrono::NaiveDate;
use schedule_store::{Doctor, DoctorFilter, Specialty};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{api_list, api_success, ApiError, ApiResponse};
use crate::server::MediConnectServer;

#[derive(Debug, Default, Deserialize)]
pub struct ListDoctorsParams {
    pub hospital_id: Option<Uuid>,
    pub specialty: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/doctors",
    tag = "doctors",
    params(
        ("hospital_id" = Option<Uuid>, Query, description = "Filter by hospital"),
        ("specialty" = Option<String>, Query, description = "Filter by department, e.g. cardiology"),
        ("include_inactive" = Option<bool>, Query, description = "Include inactive doctors")
    ),
    responses(
        (status = 200, description = "Doctors"),
        (status = 400, description = "Unknown specialty", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn list_doctors(
    State(server): State<MediConnectServer>,
    Query(params): Query<ListDoctorsParams>,
) -> Result<Json<ApiResponse<Vec<Doctor>>>, ApiError> {
    let specialty = params
        .specialty
        .as_deref()
        .map(str::parse::<Specialty>)
        .transpose()
        .map_err(ApiError::validation)?;

    let filter = DoctorFilter {
        hospital_id: params.hospital_id,
        specialty,
        active_only: !params.include_inactive,
    };
    let doctors = server.repository.list_doctors(filter).await?;
    Ok(Json(api_list(doctors, None)))
}

#[utoipa::path(
    get,
    path = "/api/doctors/{id}",
    tag = "doctors",
    params(("id" = Uuid, Path, description = "Doctor ID")),
    responses(
        (status = 200, description = "Doctor with weekly schedule"),
        (status = 404, description = "Unknown doctor", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn get_doctor(
    State(server): State<MediConnectServer>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Doctor>>, ApiError> {
    let doctor = server
        .repository
        .get_doctor(id)
        .await?
        .ok_or_else(|| ApiError::not_found("doctor"))?;
    Ok(Json(api_success(doctor)))
}

#[derive(Debug, Deserialize)]
pub struct SlotsParams {
    /// Defaults to today in clinic time
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct DoctorSlots {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub availability: SlotAvailability,
}

/// Open slots for one doctor on one date
#[utoipa::path(
    get,
    path = "/api/doctors/{id}/slots",
    tag = "doctors",
    params(
        ("id" = Uuid, Path, description = "Doctor ID"),
        ("date" = Option<String>, Query, description = "YYYY-MM-DD, defaults to today")
    ),
    responses(
        (status = 200, description = "Open slots, or not available that day"),
        (status = 404, description = "Unknown doctor", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn doctor_slots(
    State(server): State<MediConnectServer>,
    Path(id): Path<Uuid>,
    Query(params): Query<SlotsParams>,
) -> Result<Json<ApiResponse<DoctorSlots>>, ApiError> {
    let date = params.date.unwrap_or_else(|| server.clock.today());
    let availability = server.booking.find_available_slots(id, date).await?;
    Ok(Json(api_success(DoctorSlots {
        doctor_id: id,
        date,
        availability,
    })))
}
