//! # Schedule Store
//!
//! Durable records for the MediConnect booking engine: hospitals, doctors
//! and their weekly availability, patients, appointments and call
//! conversations.
//!
//! Two [`ScheduleRepository`] implementations ship with the crate:
//!
//! - [`InMemoryScheduleRepository`], DashMap-backed, for tests, demos and
//!   single-node deployments
//! - [`PostgresScheduleRepository`], sqlx-backed, where the
//!   `appointments_active_slot` partial unique index enforces one
//!   non-cancelled appointment per (doctor, date, time)
//!
//! ```rust,no_run
//! use schedule_store::{demo, InMemoryScheduleRepository, ScheduleRepository};
//!
//! # async fn example() -> schedule_store::StoreResult<()> {
//! let repo = InMemoryScheduleRepository::new();
//! let tenant = demo::seed(&repo).await?;
//! let hospital = repo.resolve_hospital_for_call(Some("01140036376")).await?;
//! assert_eq!(hospital.map(|h| h.id), Some(tenant.hospital.id));
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod conversation;
pub mod demo;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;

#[cfg(test)]
mod fixtures;

pub use connection::DatabasePool;
pub use conversation::{
    CallBilling, CallCompletion, Conversation, ConversationOutcome, ConversationStatus,
    ConversationTurn, NewConversation, OutcomeUpdate,
};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryScheduleRepository;
pub use models::*;
pub use postgres::PostgresScheduleRepository;
pub use repository::{
    AppointmentFilter, AppointmentStats, CallStats, ConversationFilter, DoctorFilter,
    ScheduleRepository,
};
