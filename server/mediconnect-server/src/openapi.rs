use utoipa::OpenApi;

/// OpenAPI document served at `/api/openapi.json`
#[derive(OpenApi)]
#[openapi(
    info(
        title = "MediConnect",
        description = "Telephone appointment booking for clinics: provider webhooks and the staff admin API"
    ),
    paths(
        // Health
        crate::handlers::health::health_check,

        // Telephony webhooks
        crate::handlers::voice::incoming,
        crate::handlers::voice::language_selected,
        crate::handlers::voice::greeting,
        crate::handlers::voice::process_speech,
        crate::handlers::voice::status_callback,
        crate::handlers::voice::reminder,

        // Admin API
        crate::handlers::hospitals::list_hospitals,
        crate::handlers::hospitals::get_hospital,
        crate::handlers::doctors::list_doctors,
        crate::handlers::doctors::get_doctor,
        crate::handlers::doctors::doctor_slots,
        crate::handlers::appointments::list_appointments,
        crate::handlers::appointments::get_appointment,
        crate::handlers::appointments::create_appointment,
        crate::handlers::appointments::update_status,
        crate::handlers::appointments::cancel_appointment,
        crate::handlers::appointments::send_reminder,
        crate::handlers::patients::search_patients,
        crate::handlers::patients::get_patient,
        crate::handlers::patients::patient_appointments,
        crate::handlers::conversations::list_conversations,
        crate::handlers::conversations::get_conversation,
        crate::handlers::analytics::dashboard,
    ),
    components(
        schemas(
            crate::handlers::health::HealthResponse,
            crate::error::ApiErrorResponse,
            crate::error::ResponseMetadata,
            crate::handlers::appointments::CreateAppointmentRequest,
            crate::handlers::appointments::UpdateStatusRequest,
        )
    ),
    tags(
        (name = "health", description = "Liveness and dependency checks"),
        (name = "voice", description = "Telephony provider webhooks; responses are call markup"),
        (name = "hospitals", description = "Hospitals and their inbound numbers"),
        (name = "doctors", description = "Doctors, weekly schedules and open slots"),
        (name = "appointments", description = "Bookings from calls and the front desk"),
        (name = "patients", description = "Patients identified by phone"),
        (name = "conversations", description = "Call records and transcripts"),
        (name = "analytics", description = "Dashboard figures"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_webhooks_and_admin_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/voice/process-speech"));
        assert!(doc.paths.paths.contains_key("/api/appointments/{id}/reminder"));
        assert!(doc.paths.paths.contains_key("/api/analytics/dashboard"));
    }

    #[test]
    fn staff_request_bodies_are_documented() {
        let doc = ApiDoc::openapi();
        let schemas = doc.components.map(|c| c.schemas).unwrap_or_default();
        assert!(schemas.contains_key("CreateAppointmentRequest"));
        assert!(schemas.contains_key("UpdateStatusRequest"));
    }
}
