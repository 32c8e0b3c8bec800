use axum::{
    extract::{Path, Query, State},
    Json,
};
use schedule_store::{Conversation, ConversationFilter, ConversationStatus};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{api_list, api_success, ApiError, ApiResponse};
use crate::server::MediConnectServer;

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListConversationsParams {
    pub hospital_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// Call records, most recent first
#[utoipa::path(
    get,
    path = "/api/conversations",
    tag = "conversations",
    params(
        ("hospital_id" = Option<Uuid>, Query, description = "Filter by hospital"),
        ("status" = Option<String>, Query, description = "in_progress, completed, failed or abandoned"),
        ("limit" = Option<usize>, Query, description = "Maximum rows, default 50")
    ),
    responses(
        (status = 200, description = "Call records with transcripts"),
        (status = 400, description = "Unknown status", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn list_conversations(
    State(server): State<MediConnectServer>,
    Query(params): Query<ListConversationsParams>,
) -> Result<Json<ApiResponse<Vec<Conversation>>>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<ConversationStatus>)
        .transpose()
        .map_err(ApiError::validation)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let filter = ConversationFilter {
        hospital_id: params.hospital_id,
        status,
        limit: Some(limit),
    };
    let conversations = server.repository.list_conversations(filter).await?;
    Ok(Json(api_list(conversations, Some(limit))))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{call_id}",
    tag = "conversations",
    params(("call_id" = String, Path, description = "Provider call id")),
    responses(
        (status = 200, description = "Call record"),
        (status = 404, description = "Unknown call", body = crate::error::ApiErrorResponse)
    )
)]
pub async fn get_conversation(
    State(server): State<MediConnectServer>,
    Path(call_id): Path<String>,
) -> Result<Json<ApiResponse<Conversation>>, ApiError> {
    let conversation = server
        .repository
        .get_conversation(&call_id)
        .await?
        .ok_or_else(|| ApiError::not_found("conversation"))?;
    Ok(Json(api_success(conversation)))
}
