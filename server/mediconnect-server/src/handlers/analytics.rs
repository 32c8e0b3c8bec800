use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use logger_redacted::mask_phone;
use schedule_store::{AppointmentStats, CallStats, ConversationFilter, ConversationStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{api_success, ApiError, ApiResponse};
use crate::server::MediConnectServer;

const RECENT_CALLS: usize = 10;
/// Upper bound on the patient count scan
const PATIENT_COUNT_CAP: usize = 100_000;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    pub hospital_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RecentCall {
    pub call_id: String,
    /// Masked; only the last four digits are shown
    pub caller: String,
    pub status: ConversationStatus,
    pub state: String,
    pub booking_successful: bool,
    pub escalated: bool,
    pub duration_secs: Option<u32>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub appointments: AppointmentStats,
    pub calls: CallStats,
    pub total_patients: usize,
    /// Percentage of calls that ended in a booking
    pub booking_success_rate: f64,
    /// Sum of per-call charges over billable calls
    pub estimated_revenue: i64,
    pub recent_calls: Vec<RecentCall>,
}

fn success_rate(calls: &CallStats) -> f64 {
    if calls.total_calls == 0 {
        return 0.0;
    }
    let rate = calls.successful_bookings as f64 / calls.total_calls as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

/// Headline numbers for the clinic dashboard
#[utoipa::path(
    get,
    path = "/api/analytics/dashboard",
    tag = "analytics",
    params(("hospital_id" = Option<Uuid>, Query, description = "Limit to one hospital")),
    responses((status = 200, description = "Dashboard figures"))
)]
pub async fn dashboard(
    State(server): State<MediConnectServer>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<ApiResponse<DashboardResponse>>, ApiError> {
    let repository = &server.repository;
    let recent_filter = ConversationFilter {
        hospital_id: params.hospital_id,
        limit: Some(RECENT_CALLS),
        ..ConversationFilter::default()
    };

    let (appointments, calls, recent, patients) = tokio::try_join!(
        repository.appointment_stats(params.hospital_id, server.clock.today()),
        repository.call_stats(params.hospital_id),
        repository.list_conversations(recent_filter),
        repository.search_patients(None, PATIENT_COUNT_CAP),
    )?;

    let recent_calls = recent
        .into_iter()
        .map(|c| RecentCall {
            caller: mask_phone(&c.caller_number),
            call_id: c.call_id,
            status: c.status,
            state: c.state,
            booking_successful: c.outcome.booking_successful,
            escalated: c.outcome.escalated,
            duration_secs: c.duration_secs,
            started_at: c.started_at,
        })
        .collect();

    Ok(Json(api_success(DashboardResponse {
        booking_success_rate: success_rate(&calls),
        estimated_revenue: calls.billable_amount,
        appointments,
        calls,
        total_patients: patients.len(),
        recent_calls,
    })))
}
