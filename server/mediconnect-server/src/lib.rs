//! # MediConnect server
//!
//! Telephony webhook protocol handler and admin API. The provider calls the
//! `/api/voice/*` webhooks once per dialogue event and receives call markup
//! back; clinic staff use the JSON API under `/api`.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
pub mod telephony;
pub mod validation;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use error::{ApiError, ApiResponse};
pub use server::{MediConnectServer, ServerComponents};

/// Create the application router with every route and middleware layer.
///
/// Webhooks get their own deadline that still answers with call markup; the
/// admin API uses the plain request timeout.
pub fn create_app(server: MediConnectServer) -> Router {
    let timeout = Duration::from_secs(server.config.server.request_timeout_secs);

    let webhooks = routes::voice_routes().layer(from_fn_with_state(
        server.clone(),
        middleware::webhook_deadline_middleware,
    ));
    let admin = routes::admin_routes().layer(TimeoutLayer::new(timeout));

    webhooks
        .merge(admin)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer())
                .layer(from_fn(middleware::request_timing_middleware)),
        )
        .with_state(server)
}
