//! Telephony provider webhooks. Every handler answers with call markup,
//! except the status callback which only acknowledges.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::server::MediConnectServer;
use crate::services::call_flow;
use crate::telephony::{VoiceResponse, WebhookPayload};

/// New inbound call
#[utoipa::path(
    post,
    path = "/api/voice/incoming",
    tag = "voice",
    responses((status = 200, description = "Language menu markup", content_type = "application/xml"))
)]
pub async fn incoming(
    State(server): State<MediConnectServer>,
    payload: WebhookPayload,
) -> VoiceResponse {
    call_flow::incoming(&server, &payload).await
}

/// Digit pressed at the language menu
#[utoipa::path(
    post,
    path = "/api/voice/language-selected",
    tag = "voice",
    responses((status = 200, description = "Greeting markup", content_type = "application/xml"))
)]
pub async fn language_selected(
    State(server): State<MediConnectServer>,
    payload: WebhookPayload,
) -> VoiceResponse {
    call_flow::language_selected(&server, &payload).await
}

/// Greeting in the language carried on the callback URL
#[utoipa::path(
    post,
    path = "/api/voice/greeting",
    tag = "voice",
    responses((status = 200, description = "Greeting markup", content_type = "application/xml"))
)]
pub async fn greeting(
    State(server): State<MediConnectServer>,
    payload: WebhookPayload,
) -> VoiceResponse {
    call_flow::greeting(&server, &payload).await
}

/// A recorded caller utterance
#[utoipa::path(
    post,
    path = "/api/voice/process-speech",
    tag = "voice",
    responses((status = 200, description = "Reply markup", content_type = "application/xml"))
)]
pub async fn process_speech(
    State(server): State<MediConnectServer>,
    payload: WebhookPayload,
) -> VoiceResponse {
    call_flow::process_speech(&server, &payload).await
}

/// Call status callback; also mounted as `/api/voice/call-ended`
#[utoipa::path(
    post,
    path = "/api/voice/status-callback",
    tag = "voice",
    responses((status = 200, description = "Acknowledgement"))
)]
pub async fn status_callback(
    State(server): State<MediConnectServer>,
    payload: WebhookPayload,
) -> Json<serde_json::Value> {
    Json(call_flow::call_ended(&server, &payload).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderQuery {
    pub appointment_id: Uuid,
}

/// Markup fetched by the provider when an outbound reminder connects
#[utoipa::path(
    get,
    path = "/api/voice/reminder",
    tag = "voice",
    params(("appointmentId" = Uuid, Query, description = "Appointment to remind about")),
    responses((status = 200, description = "Reminder markup", content_type = "application/xml"))
)]
pub async fn reminder(
    State(server): State<MediConnectServer>,
    query: Option<Query<ReminderQuery>>,
) -> VoiceResponse {
    match query {
        Some(Query(query)) => call_flow::reminder(&server, query.appointment_id).await,
        None => {
            tracing::warn!("Reminder markup requested without an appointment id");
            VoiceResponse::technical_difficulties()
        }
    }
}
