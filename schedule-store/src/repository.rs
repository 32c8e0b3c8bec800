use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::conversation::{
    CallCompletion, Conversation, ConversationStatus, ConversationTurn, NewConversation,
    OutcomeUpdate,
};
use crate::error::StoreResult;
use crate::models::*;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoctorFilter {
    pub hospital_id: Option<Uuid>,
    pub specialty: Option<Specialty>,
    pub active_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub hospital_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub limit: Option<usize>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.hospital_id.map_or(true, |id| appointment.hospital_id == id)
            && self.doctor_id.map_or(true, |id| appointment.doctor_id == id)
            && self.patient_id.map_or(true, |id| appointment.patient_id == id)
            && self.date.map_or(true, |d| appointment.date == d)
            && self.status.map_or(true, |s| appointment.status == s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationFilter {
    pub hospital_id: Option<Uuid>,
    pub status: Option<ConversationStatus>,
    pub limit: Option<usize>,
}

impl ConversationFilter {
    pub fn matches(&self, conversation: &Conversation) -> bool {
        self.hospital_id
            .map_or(true, |id| conversation.hospital_id == Some(id))
            && self.status.map_or(true, |s| conversation.status == s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppointmentStats {
    pub total: u64,
    pub today: u64,
    pub by_status: BTreeMap<AppointmentStatus, u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallStats {
    pub total_calls: u64,
    pub successful_bookings: u64,
    pub escalated: u64,
    /// Sum of per-call charges over billable calls
    pub billable_amount: i64,
}

/// Durable store for hospitals, doctors, patients, appointments and call records
///
/// `create_appointment` is the one operation with a concurrency contract:
/// the slot check, patient upsert, number allocation and insert happen as one
/// atomic step, and a lost race surfaces as [`crate::StoreError::SlotTaken`].
#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    // Hospitals
    async fn insert_hospital(&self, hospital: Hospital) -> StoreResult<Hospital>;
    async fn get_hospital(&self, id: Uuid) -> StoreResult<Option<Hospital>>;
    async fn find_hospital_by_inbound_number(&self, number: &str)
        -> StoreResult<Option<Hospital>>;
    async fn list_hospitals(&self, active_only: bool) -> StoreResult<Vec<Hospital>>;

    // Doctors
    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor>;
    async fn get_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>>;
    async fn list_doctors(&self, filter: DoctorFilter) -> StoreResult<Vec<Doctor>>;

    // Patients
    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>>;
    async fn find_patient_by_phone(&self, phone: &str) -> StoreResult<Option<Patient>>;
    async fn search_patients(&self, query: Option<&str>, limit: usize)
        -> StoreResult<Vec<Patient>>;

    // Appointments
    async fn create_appointment(&self, new: NewAppointment) -> StoreResult<BookedAppointment>;
    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>>;
    async fn list_appointments(&self, filter: AppointmentFilter)
        -> StoreResult<Vec<Appointment>>;
    /// Times on `date` held by a non-cancelled appointment, ascending
    async fn booked_times(&self, doctor_id: Uuid, date: NaiveDate)
        -> StoreResult<Vec<NaiveTime>>;
    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> StoreResult<Appointment>;
    async fn appointment_stats(
        &self,
        hospital_id: Option<Uuid>,
        today: NaiveDate,
    ) -> StoreResult<AppointmentStats>;

    // Conversations
    async fn create_conversation(&self, new: NewConversation) -> StoreResult<Conversation>;
    async fn get_conversation(&self, call_id: &str) -> StoreResult<Option<Conversation>>;
    async fn set_conversation_language(&self, call_id: &str, language: Language)
        -> StoreResult<()>;
    async fn append_turn(&self, call_id: &str, turn: ConversationTurn) -> StoreResult<()>;
    async fn record_outcome(&self, call_id: &str, update: OutcomeUpdate) -> StoreResult<()>;
    async fn complete_conversation(
        &self,
        call_id: &str,
        completion: CallCompletion,
    ) -> StoreResult<Conversation>;
    async fn list_conversations(&self, filter: ConversationFilter)
        -> StoreResult<Vec<Conversation>>;
    async fn call_stats(&self, hospital_id: Option<Uuid>) -> StoreResult<CallStats>;

    async fn health_check(&self) -> bool;

    /// Hospital for an incoming call.
    ///
    /// Unknown or missing dialed numbers fall back to the only active
    /// hospital when exactly one exists; otherwise `None`.
    async fn resolve_hospital_for_call(
        &self,
        dialed_number: Option<&str>,
    ) -> StoreResult<Option<Hospital>> {
        if let Some(number) = dialed_number {
            let normalized = normalize_phone(number);
            if !normalized.is_empty() {
                if let Some(hospital) = self.find_hospital_by_inbound_number(&normalized).await? {
                    if hospital.is_active {
                        return Ok(Some(hospital));
                    }
                }
            }
        }

        let mut active = self.list_hospitals(true).await?;
        if active.len() == 1 {
            tracing::debug!("Dialed number unknown, using the single active hospital");
            return Ok(active.pop());
        }
        Ok(None)
    }
}
