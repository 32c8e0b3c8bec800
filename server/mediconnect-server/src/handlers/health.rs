use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::server::MediConnectServer;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status: `healthy` or `degraded`
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Seconds since the server started
    #[schema(example = 3600)]
    pub uptime_secs: u64,
    /// Schedule store reachable
    pub store: bool,
    /// Dialogue session store reachable
    pub sessions: bool,
    #[schema(example = "rules")]
    pub nlu_backend: String,
    #[schema(example = "memory")]
    pub session_store: String,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health_check(
    State(server): State<MediConnectServer>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let (store, sessions) = tokio::join!(
        server.repository.health_check(),
        server.sessions.health_check()
    );
    let status = if store && sessions { "healthy" } else { "degraded" };

    Ok(Json(api_success(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: server.started_at.elapsed().as_secs(),
        store,
        sessions,
        nlu_backend: server.nlu.backend_name().to_string(),
        session_store: server.sessions.backend_name().to_string(),
    })))
}
