use chrono::{NaiveDate, NaiveTime};
use config_engine::BookingSettings;
use schedule_store::{
    Appointment, AppointmentStatus, BookingChannel, Language, Patient, PatientIdentity, Specialty,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingConfig {
    pub slot_minutes: u32,
    pub appointment_prefix: String,
    pub max_alternatives: usize,
    /// Days scanned forward when looking for alternatives
    pub lookahead_days: u32,
    /// Status given to new appointments
    pub initial_status: AppointmentStatus,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            appointment_prefix: "MED".to_string(),
            max_alternatives: 3,
            lookahead_days: 7,
            initial_status: AppointmentStatus::Booked,
        }
    }
}

impl From<&BookingSettings> for BookingConfig {
    fn from(settings: &BookingSettings) -> Self {
        Self {
            slot_minutes: settings.slot_minutes,
            appointment_prefix: settings.appointment_prefix.clone(),
            max_alternatives: settings.max_alternatives,
            lookahead_days: settings.lookahead_days,
            ..Self::default()
        }
    }
}

/// One open (date, time) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotOption {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "slots", rename_all = "snake_case")]
pub enum SlotAvailability {
    /// Open start times in ascending order, possibly empty when fully booked
    Open(Vec<NaiveTime>),
    /// The doctor has no window on that weekday
    NotAvailableThatDay,
}

impl SlotAvailability {
    pub fn open_times(&self) -> &[NaiveTime] {
        match self {
            SlotAvailability::Open(times) => times,
            SlotAvailability::NotAvailableThatDay => &[],
        }
    }

    pub fn is_open(&self, time: NaiveTime) -> bool {
        self.open_times().contains(&time)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub hospital_id: Uuid,
    pub doctor_id: Uuid,
    pub patient: PatientIdentity,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub symptoms: Option<String>,
    pub language: Language,
    pub channel: BookingChannel,
    /// Call that produced the booking, for voice bookings
    pub call_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingConfirmation {
    pub appointment: Appointment,
    pub patient: Patient,
    pub doctor_name: String,
    pub specialty: Specialty,
}
