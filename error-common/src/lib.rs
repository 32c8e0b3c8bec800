//! Common error handling utilities for the MediConnect booking engine
//!
//! Every crate in the workspace owns its own `thiserror` enum. This crate
//! supplies the pieces they share so the telephony handler can make one
//! decision per failure, whatever crate it came from:
//!
//! - **ErrorCategory**: the four-way taxonomy that decides how a failure
//!   is surfaced to a caller on the phone
//! - **Categorized**: implemented by every domain error
//! - **Error Codes**: stable string codes written to logs and conversation records
//! - **ErrorContext**: call-scoped context attached to logged failures
//!
//! # Error Categories
//!
//! - **Input**: no speech, unusable digit input. Re-prompt within the same state.
//! - **Backend**: transcription, NLU or store failures. Apologise and hand off to a human.
//! - **BusinessRule**: slot taken, department not served. Spoken as a normal reply.
//! - **Protocol**: malformed webhook payloads. Safe default markup, then hang up.
//!
//! # Example
//!
//! ```rust
//! use error_common::{Categorized, ErrorCategory, codes};
//!
//! #[derive(Debug)]
//! struct NoSpeech;
//!
//! impl Categorized for NoSpeech {
//!     fn category(&self) -> ErrorCategory {
//!         ErrorCategory::Input
//!     }
//!
//!     fn code(&self) -> &'static str {
//!         codes::telephony::NO_SPEECH
//!     }
//! }
//!
//! assert!(NoSpeech.category().is_recoverable_in_call());
//! ```

pub mod types;
pub mod context;
pub mod codes;

pub use types::*;
pub use context::*;
