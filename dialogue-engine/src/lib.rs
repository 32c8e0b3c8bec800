//! # Dialogue Engine
//!
//! Per-call dialogue sessions and the slot filler that drives them.
//!
//! - [`SessionStore`] keeps one [`DialogueSession`] per call id, in process
//!   ([`InMemorySessionStore`]) or in Redis ([`RedisSessionStore`]); a
//!   session deleted at call end is never recreated by a late turn
//! - [`NluEngine`] runs an [`NluBackend`] for one caller turn and validates
//!   its output into an [`NluDecision`]: states come from a closed set,
//!   doctors from the hospital's [`DoctorCatalog`], relative dates resolve
//!   against the clinic clock, and failures become a hand-off
//! - [`RuleBasedNlu`] understands English, Hindi and Hinglish booking talk
//!   without a network; [`LlmNluBackend`] asks an OpenAI-compatible model
//!
//! ```rust,no_run
//! use booking_engine::SystemClock;
//! use dialogue_engine::{NluConfig, NluEngine, RuleBasedNlu};
//! use std::sync::Arc;
//!
//! let engine = NluEngine::new(
//!     Arc::new(RuleBasedNlu::new()),
//!     Arc::new(SystemClock::new(330)),
//!     NluConfig::default(),
//! );
//! assert_eq!(engine.backend_name(), "rules");
//! ```

pub mod catalog;
pub mod dates;
pub mod error;
pub mod fields;
pub mod nlu;
pub mod phrases;
pub mod session;
pub mod state;
pub mod store;

pub use catalog::DoctorCatalog;
pub use error::{NluError, NluResult, SessionError, SessionResult};
pub use fields::{BookingFields, ExtractedFields, FieldUpdates, MissingField};
pub use nlu::{
    AvailabilitySource, BackendReply, EscalationReason, LlmNluBackend, NluBackend, NluConfig,
    NluContext, NluDecision, NluEngine, RuleBasedNlu,
};
pub use session::{ChatMessage, ChatRole, DialogueSession, SessionSeed};
pub use state::{DialogueState, NluAction, NluState};
pub use store::{spawn_purge_task, InMemorySessionStore, RedisSessionStore, SessionStore};
