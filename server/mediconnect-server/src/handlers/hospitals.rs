use axum::{
    extract::{Path, Query, State},
    Json,
};
use schedule_store::Hospital;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{api_list, api_success, ApiError, ApiResponse};
use crate::server::MediConnectServer;

#[derive(Debug, Default, Deserialize)]
pub struct ListHospitalsParams {
    /// Include deactivated hospitals
    #[serde(default)]
    pub include_inactive: bool,
}

#[utoipa::path(
    get,
    path = "/api/hospitals",
    tag = "hospitals",
    params(("include_inactive" = Option<bool>, Query, description = "Include deactivated hospitals")),
    responses((status = 200, description = "Hospitals served by this deployment"))
)]
pub async fn list_hospitals(
    State(server): State<MediConnectServer>,
    Query(params): Query<ListHospitalsParams>,
) -> Result<Json<ApiResponse<Vec<Hospital>>>, ApiError> {
    let hospitals = server
        .repository
        .list_hospitals(!params.include_inactive)
        .await?;
    Ok(Json(api_list(hospitals, None)))
}

#[utoipa::path(
    get,
    path = "/api/hospitals/{id}",
    tag = "hospitals",
    params(("id" = Uuid, Path, description = "Hospital ID")),
    responses(
        (status = 200, description = "Hospital"),
        (status = 404, description = "Unknown hospital", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn get_hospital(
    State(server): State<MediConnectServer>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Hospital>>, ApiError> {
    let hospital = server
        .repository
        .get_hospital(id)
        .await?
        .ok_or_else(|| ApiError::not_found("hospital"))?;
    Ok(Json(api_success(hospital)))
}
