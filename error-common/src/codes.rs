// Error codes implementation
// Stable codes recorded against conversation records and in structured logs

pub mod telephony {
    pub const NO_SPEECH: &str = "TEL_1001";
    pub const INVALID_DIGIT: &str = "TEL_1002";
    pub const MISSING_CALL_ID: &str = "TEL_1003";
    pub const MALFORMED_WEBHOOK: &str = "TEL_1004";
    pub const UNKNOWN_HOSPITAL: &str = "TEL_1005";
    pub const SESSION_GONE: &str = "TEL_1006";
    pub const OUTBOUND_FAILED: &str = "TEL_1007";
    pub const WEBHOOK_DEADLINE: &str = "TEL_1008";
}

pub mod speech {
    pub const PROVIDER_FAILED: &str = "STT_2001";
    pub const RECORDING_UNAVAILABLE: &str = "STT_2002";
    pub const TIMEOUT: &str = "STT_2003";
    pub const MISCONFIGURED: &str = "STT_2004";
}

pub mod nlu {
    pub const BACKEND_FAILED: &str = "NLU_3001";
    pub const MALFORMED_OUTPUT: &str = "NLU_3002";
    pub const INVALID_STATE: &str = "NLU_3003";
    pub const TIMEOUT: &str = "NLU_3004";
    pub const TURN_LIMIT: &str = "NLU_3005";
}

pub mod booking {
    pub const DOCTOR_NOT_FOUND: &str = "BOOK_4001";
    pub const SLOT_UNAVAILABLE: &str = "BOOK_4002";
    pub const SLOT_CONFLICT: &str = "BOOK_4003";
    pub const NOT_AVAILABLE_THAT_DAY: &str = "BOOK_4004";
    pub const INVALID_TRANSITION: &str = "BOOK_4005";
    pub const INVALID_REQUEST: &str = "BOOK_4006";
}

pub mod store {
    pub const CONNECTION_FAILED: &str = "DB_5001";
    pub const QUERY_FAILED: &str = "DB_5002";
    pub const NOT_FOUND: &str = "DB_5003";
    pub const INVALID_SCHEDULE: &str = "DB_5004";
}

pub mod config {
    pub const INVALID_VALUE: &str = "CFG_6001";
    pub const LOAD_FAILED: &str = "CFG_6002";
}
