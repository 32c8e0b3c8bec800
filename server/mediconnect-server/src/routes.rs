pub mod paths;

use axum::{
    routing::{get, post, put},
    Json, Router,
};

use crate::handlers::{
    analytics, appointments, conversations, doctors, health, hospitals, patients, voice,
};
use crate::openapi::ApiDoc;
use crate::server::MediConnectServer;
use utoipa::OpenApi;

/// Create health check routes
pub fn health_routes() -> Router<MediConnectServer> {
    Router::new().route(paths::health::HEALTH, get(health::health_check))
}

/// Telephony webhooks. Providers differ on GET or POST, so both are served.
pub fn voice_routes() -> Router<MediConnectServer> {
    Router::new()
        .route(
            paths::voice::INCOMING,
            post(voice::incoming).get(voice::incoming),
        )
        .route(
            paths::voice::LANGUAGE_SELECTED,
            post(voice::language_selected).get(voice::language_selected),
        )
        .route(
            paths::voice::GREETING,
            post(voice::greeting).get(voice::greeting),
        )
        .route(
            paths::voice::PROCESS_SPEECH,
            post(voice::process_speech).get(voice::process_speech),
        )
        .route(
            paths::voice::STATUS_CALLBACK,
            post(voice::status_callback).get(voice::status_callback),
        )
        .route(
            paths::voice::CALL_ENDED,
            post(voice::status_callback).get(voice::status_callback),
        )
        .route(
            paths::voice::REMINDER,
            get(voice::reminder).post(voice::reminder),
        )
}

pub fn hospital_routes() -> Router<MediConnectServer> {
    Router::new()
        .route(paths::hospitals::HOSPITALS, get(hospitals::list_hospitals))
        .route(paths::hospitals::HOSPITAL_BY_ID, get(hospitals::get_hospital))
}

pub fn doctor_routes() -> Router<MediConnectServer> {
    Router::new()
        .route(paths::doctors::DOCTORS, get(doctors::list_doctors))
        .route(paths::doctors::DOCTOR_BY_ID, get(doctors::get_doctor))
        .route(paths::doctors::DOCTOR_SLOTS, get(doctors::doctor_slots))
}

pub fn appointment_routes() -> Router<MediConnectServer> {
    Router::new()
        .route(
            paths::appointments::APPOINTMENTS,
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            paths::appointments::APPOINTMENT_BY_ID,
            get(appointments::get_appointment),
        )
        .route(
            paths::appointments::APPOINTMENT_STATUS,
            put(appointments::update_status),
        )
        .route(
            paths::appointments::APPOINTMENT_CANCEL,
            put(appointments::cancel_appointment),
        )
        .route(
            paths::appointments::APPOINTMENT_REMINDER,
            post(appointments::send_reminder),
        )
}

pub fn patient_routes() -> Router<MediConnectServer> {
    Router::new()
        .route(paths::patients::PATIENTS, get(patients::search_patients))
        .route(paths::patients::PATIENT_BY_ID, get(patients::get_patient))
        .route(
            paths::patients::PATIENT_APPOINTMENTS,
            get(patients::patient_appointments),
        )
}

pub fn conversation_routes() -> Router<MediConnectServer> {
    Router::new()
        .route(
            paths::conversations::CONVERSATIONS,
            get(conversations::list_conversations),
        )
        .route(
            paths::conversations::CONVERSATION_BY_CALL_ID,
            get(conversations::get_conversation),
        )
}

pub fn analytics_routes() -> Router<MediConnectServer> {
    Router::new().route(paths::analytics::DASHBOARD, get(analytics::dashboard))
}

pub fn openapi_routes() -> Router<MediConnectServer> {
    Router::new().route(
        paths::OPENAPI_JSON,
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

/// JSON routes for clinic staff; the webhooks are mounted separately
pub fn admin_routes() -> Router<MediConnectServer> {
    Router::new()
        .merge(health_routes())
        .merge(hospital_routes())
        .merge(doctor_routes())
        .merge(appointment_routes())
        .merge(patient_routes())
        .merge(conversation_routes())
        .merge(analytics_routes())
        .merge(openapi_routes())
}
