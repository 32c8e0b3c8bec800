//! Route path constants
//!
//! Runtime route definitions use these constants. utoipa `#[path(...)]`
//! attributes need string literals, so the paths in handler annotations
//! must be kept in step with this file by hand.

/// Health check endpoints
pub mod health {
    pub const HEALTH: &str = "/api/health";
}

/// Telephony webhook endpoints
pub mod voice {
    pub const INCOMING: &str = "/api/voice/incoming";
    pub const LANGUAGE_SELECTED: &str = "/api/voice/language-selected";
    pub const GREETING: &str = "/api/voice/greeting";
    pub const PROCESS_SPEECH: &str = "/api/voice/process-speech";
    pub const STATUS_CALLBACK: &str = "/api/voice/status-callback";
    pub const CALL_ENDED: &str = "/api/voice/call-ended";
    pub const REMINDER: &str = "/api/voice/reminder";
}

pub mod hospitals {
    pub const HOSPITALS: &str = "/api/hospitals";
    pub const HOSPITAL_BY_ID: &str = "/api/hospitals/:id";
}

pub mod doctors {
    pub const DOCTORS: &str = "/api/doctors";
    pub const DOCTOR_BY_ID: &str = "/api/doctors/:id";
    pub const DOCTOR_SLOTS: &str = "/api/doctors/:id/slots";
}

pub mod appointments {
    pub const APPOINTMENTS: &str = "/api/appointments";
    pub const APPOINTMENT_BY_ID: &str = "/api/appointments/:id";
    pub const APPOINTMENT_STATUS: &str = "/api/appointments/:id/status";
    pub const APPOINTMENT_CANCEL: &str = "/api/appointments/:id/cancel";
    pub const APPOINTMENT_REMINDER: &str = "/api/appointments/:id/reminder";
}

pub mod patients {
    pub const PATIENTS: &str = "/api/patients";
    pub const PATIENT_BY_ID: &str = "/api/patients/:id";
    pub const PATIENT_APPOINTMENTS: &str = "/api/patients/:id/appointments";
}

pub mod conversations {
    pub const CONVERSATIONS: &str = "/api/conversations";
    pub const CONVERSATION_BY_CALL_ID: &str = "/api/conversations/:call_id";
}

pub mod analytics {
    pub const DASHBOARD: &str = "/api/analytics/dashboard";
}

pub const OPENAPI_JSON: &str = "/api/openapi.json";
