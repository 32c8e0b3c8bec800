use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use error_common::codes;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;

use crate::server::MediConnectServer;
use crate::telephony::VoiceResponse;

/// Request timing middleware
pub async fn request_timing_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    // Path only: webhook query strings carry call ids and caller numbers
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    if elapsed > Duration::from_secs(5) {
        tracing::warn!(
            method = %method,
            path = %path,
            duration_ms = elapsed.as_millis(),
            status,
            "Slow request; the telephony provider may have given up"
        );
    } else {
        tracing::info!(
            method = %method,
            path = %path,
            duration_ms = elapsed.as_millis(),
            status,
            "Request processed"
        );
    }

    response
}

/// Deadline for telephony webhooks.
///
/// The turn runs on its own task, so a late turn still finishes its writes
/// instead of being dropped halfway; the provider meanwhile gets an apology
/// and a hangup rather than an empty error response.
pub async fn webhook_deadline_middleware(
    State(server): State<MediConnectServer>,
    request: Request,
    next: Next,
) -> Response {
    let deadline = Duration::from_secs(server.config.server.request_timeout_secs);
    let path = request.uri().path().to_string();
    let turn = tokio::spawn(next.run(request));

    match tokio::time::timeout(deadline, turn).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(path = %path, error = %e, "Webhook task failed");
            VoiceResponse::technical_difficulties().into_response()
        }
        Err(_) => {
            tracing::warn!(
                path = %path,
                deadline_secs = deadline.as_secs(),
                code = codes::telephony::WEBHOOK_DEADLINE,
                "Webhook missed its deadline, answering with an apology"
            );
            VoiceResponse::technical_difficulties().into_response()
        }
    }
}

/// CORS for the clinic dashboard; webhooks are server-to-server and unaffected
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
            HeaderValue::from_static("http://localhost:5173"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600))
}
