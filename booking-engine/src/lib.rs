//! # Booking Engine
//!
//! Derives open appointment slots from a doctor's weekly availability and
//! books them without double-booking.
//!
//! - [`BookingEngine::find_available_slots`] returns the doctor's window
//!   slots minus held appointments (and minus past times on the current
//!   clinic day), or an explicit "not available that day"
//! - [`BookingEngine::book_appointment`] validates, then commits through the
//!   store's atomic insert; a lost race is a [`BookingError::SlotConflict`]
//!   carrying alternative times
//! - A [`Clock`] supplies clinic-local "now" so relative dates and past-slot
//!   filtering are deterministic under test
//!
//! ```rust,no_run
//! use booking_engine::{BookingConfig, BookingEngine, SystemClock};
//! use schedule_store::InMemoryScheduleRepository;
//! use std::sync::Arc;
//!
//! let engine = BookingEngine::new(
//!     Arc::new(InMemoryScheduleRepository::new()),
//!     Arc::new(SystemClock::new(330)),
//!     BookingConfig::default(),
//! );
//! ```

pub mod clock;
pub mod engine;
pub mod error;
pub mod models;
pub mod slots;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::BookingEngine;
pub use error::{BookingError, BookingResult};
pub use models::*;
