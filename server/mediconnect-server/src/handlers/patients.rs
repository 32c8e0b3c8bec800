use axum::{
    extract::{Path, Query, State},
    Json,
};
use schedule_store::{Appointment, AppointmentFilter, Patient};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{api_list, api_success, ApiError, ApiResponse};
use crate::server::MediConnectServer;

const DEFAULT_SEARCH_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct SearchPatientsParams {
    /// Matches name or phone digits
    pub search: Option<String>,
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/patients",
    tag = "patients",
    params(
        ("search" = Option<String>, Query, description = "Name or phone fragment"),
        ("limit" = Option<usize>, Query, description = "Maximum rows, default 50")
    ),
    responses((status = 200, description = "Matching patients"))
)]
pub async fn search_patients(
    State(server): State<MediConnectServer>,
    Query(params): Query<SearchPatientsParams>,
) -> Result<Json<ApiResponse<Vec<Patient>>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    let query = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());
    let patients = server.repository.search_patients(query, limit).await?;
    Ok(Json(api_list(patients, Some(limit))))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    tag = "patients",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient with visit counters"),
        (status = 404, description = "Unknown patient", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn get_patient(
    State(server): State<MediConnectServer>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Patient>>, ApiError> {
    let patient = server
        .repository
        .get_patient(id)
        .await?
        .ok_or_else(|| ApiError::not_found("patient"))?;
    Ok(Json(api_success(patient)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{id}/appointments",
    tag = "patients",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "The patient's appointments"),
        (status = 404, description = "Unknown patient", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn patient_appointments(
    State(server): State<MediConnectServer>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, ApiError> {
    if server.repository.get_patient(id).await?.is_none() {
        return Err(ApiError::not_found("patient"));
    }
    let filter = AppointmentFilter {
        patient_id: Some(id),
        ..AppointmentFilter::default()
    };
    let appointments = server.repository.list_appointments(filter).await?;
    Ok(Json(api_list(appointments, None)))
}
