// Schedule store models
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// Spoken language of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "hi-IN", alias = "hi")]
    Hindi,
    #[serde(rename = "en-IN", alias = "en")]
    English,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Hindi, Language::English];

    /// BCP-47 code used by the speech and telephony providers
    pub fn code(&self) -> &'static str {
        match self {
            Language::Hindi => "hi-IN",
            Language::English => "en-IN",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "hi-in" | "hi" | "hindi" => Some(Language::Hindi),
            "en-in" | "en" | "english" => Some(Language::English),
            _ => None,
        }
    }

    /// Language-menu key press: 1 for Hindi, 2 for English
    pub fn from_digit(digits: &str) -> Option<Self> {
        match digits.trim() {
            "1" => Some(Language::Hindi),
            "2" => Some(Language::English),
            _ => None,
        }
    }

    /// Secondary recognition language; callers switch between the two freely
    pub fn alternate(&self) -> Language {
        match self {
            Language::Hindi => Language::English,
            Language::English => Language::Hindi,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s).ok_or_else(|| format!("unsupported language: {s}"))
    }
}

/// Department a doctor practises in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    General,
    Cardiology,
    Orthopedics,
    Gynecology,
    Dermatology,
    Pediatrics,
    Ent,
    Dentistry,
    Neurology,
    Ophthalmology,
}

impl Specialty {
    pub const ALL: [Specialty; 10] = [
        Specialty::General,
        Specialty::Cardiology,
        Specialty::Orthopedics,
        Specialty::Gynecology,
        Specialty::Dermatology,
        Specialty::Pediatrics,
        Specialty::Ent,
        Specialty::Dentistry,
        Specialty::Neurology,
        Specialty::Ophthalmology,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Specialty::General => "general",
            Specialty::Cardiology => "cardiology",
            Specialty::Orthopedics => "orthopedics",
            Specialty::Gynecology => "gynecology",
            Specialty::Dermatology => "dermatology",
            Specialty::Pediatrics => "pediatrics",
            Specialty::Ent => "ent",
            Specialty::Dentistry => "dentistry",
            Specialty::Neurology => "neurology",
            Specialty::Ophthalmology => "ophthalmology",
        }
    }

    /// Department name as spoken to the caller
    pub fn display_name(&self, language: Language) -> &'static str {
        match (self, language) {
            (Specialty::General, Language::English) => "General Medicine",
            (Specialty::General, Language::Hindi) => "सामान्य चिकित्सा",
            (Specialty::Cardiology, Language::English) => "Cardiology",
            (Specialty::Cardiology, Language::Hindi) => "हृदय रोग",
            (Specialty::Orthopedics, Language::English) => "Orthopedics",
            (Specialty::Orthopedics, Language::Hindi) => "हड्डी रोग",
            (Specialty::Gynecology, Language::English) => "Gynecology",
            (Specialty::Gynecology, Language::Hindi) => "स्त्री रोग",
            (Specialty::Dermatology, Language::English) => "Dermatology",
            (Specialty::Dermatology, Language::Hindi) => "त्वचा रोग",
            (Specialty::Pediatrics, Language::English) => "Pediatrics",
            (Specialty::Pediatrics, Language::Hindi) => "बाल रोग",
            (Specialty::Ent, Language::English) => "ENT",
            (Specialty::Ent, Language::Hindi) => "कान, नाक, गला",
            (Specialty::Dentistry, Language::English) => "Dentistry",
            (Specialty::Dentistry, Language::Hindi) => "दंत चिकित्सा",
            (Specialty::Neurology, Language::English) => "Neurology",
            (Specialty::Neurology, Language::Hindi) => "तंत्रिका रोग",
            (Specialty::Ophthalmology, Language::English) => "Ophthalmology",
            (Specialty::Ophthalmology, Language::Hindi) => "नेत्र रोग",
        }
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Specialty::ALL
            .into_iter()
            .find(|sp| sp.as_str() == wanted)
            .ok_or_else(|| format!("unknown specialty: {s}"))
    }
}

/// Reduce a phone number to its 10-digit national form.
///
/// `+91 98765 43210`, `09876543210` and `919876543210` all become
/// `9876543210`; STD landlines lose their trunk `0`.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 12 && digits.starts_with("91") {
        digits.chars().skip(2).collect()
    } else if digits.len() == 11 && digits.starts_with('0') {
        digits.chars().skip(1).collect()
    } else {
        digits
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greetings {
    pub hindi: String,
    pub english: String,
}

impl Greetings {
    pub fn for_language(&self, language: Language) -> &str {
        match language {
            Language::Hindi => &self.hindi,
            Language::English => &self.english,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    /// Reception line for human hand-off
    pub phone_number: String,
    /// The telephony number routed to this hospital, normalised
    pub inbound_number: String,
    pub address: Option<String>,
    pub email: Option<String>,
    pub working_hours: WorkingHours,
    pub working_days: Vec<Weekday>,
    pub default_language: Language,
    pub greetings: Greetings,
    /// Flat charge per handled call, in whole rupees
    pub cost_per_call: i64,
    pub currency: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One bookable interval on one weekday, half-open `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityWindow {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl AvailabilityWindow {
    pub fn new(weekday: Weekday, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            weekday,
            start,
            end,
        }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }

    fn overlaps(&self, other: &AvailabilityWindow) -> bool {
        self.weekday == other.weekday && self.start < other.end && other.start < self.end
    }
}

/// A doctor's weekly availability template.
///
/// Windows on the same weekday never overlap and every window is non-empty;
/// both are checked on construction and on deserialisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AvailabilityWindow>", into = "Vec<AvailabilityWindow>")]
pub struct WeeklySchedule {
    windows: Vec<AvailabilityWindow>,
}

impl WeeklySchedule {
    pub fn new(mut windows: Vec<AvailabilityWindow>) -> StoreResult<Self> {
        for window in &windows {
            if window.start >= window.end {
                return Err(StoreError::InvalidSchedule(format!(
                    "{:?} window {}-{} ends before it starts",
                    window.weekday, window.start, window.end
                )));
            }
        }

        windows.sort_by_key(|w| (w.weekday.num_days_from_monday(), w.start));
        for pair in windows.windows(2) {
            if let [a, b] = pair {
                if a.overlaps(b) {
                    return Err(StoreError::InvalidSchedule(format!(
                        "{:?} windows {}-{} and {}-{} overlap",
                        a.weekday, a.start, a.end, b.start, b.end
                    )));
                }
            }
        }

        Ok(Self { windows })
    }

    pub fn empty() -> Self {
        Self {
            windows: Vec::new(),
        }
    }

    pub fn windows(&self) -> &[AvailabilityWindow] {
        &self.windows
    }

    /// Windows for a weekday in start-time order
    pub fn windows_on(&self, weekday: Weekday) -> impl Iterator<Item = &AvailabilityWindow> + '_ {
        self.windows.iter().filter(move |w| w.weekday == weekday)
    }

    pub fn works_on(&self, weekday: Weekday) -> bool {
        self.windows_on(weekday).next().is_some()
    }

    pub fn working_days(&self) -> Vec<Weekday> {
        let mut days: Vec<Weekday> = self.windows.iter().map(|w| w.weekday).collect();
        days.dedup();
        days
    }

    /// Whether `time` on `date` falls inside a window
    pub fn covers(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.windows_on(date.weekday()).any(|w| w.contains(time))
    }
}

impl TryFrom<Vec<AvailabilityWindow>> for WeeklySchedule {
    type Error = StoreError;

    fn try_from(windows: Vec<AvailabilityWindow>) -> Result<Self, Self::Error> {
        WeeklySchedule::new(windows)
    }
}

impl From<WeeklySchedule> for Vec<AvailabilityWindow> {
    fn from(schedule: WeeklySchedule) -> Self {
        schedule.windows
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub name: String,
    pub specialty: Specialty,
    pub qualification: Option<String>,
    pub experience_years: u32,
    /// Consultation fee in whole rupees
    pub consultation_fee: i64,
    pub languages: Vec<Language>,
    pub schedule: WeeklySchedule,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientStats {
    pub total: u32,
    pub completed: u32,
    pub cancelled: u32,
    pub no_show: u32,
}

impl PatientStats {
    /// Counters only ever move forward
    pub fn record_transition(&mut self, to: AppointmentStatus) {
        match to {
            AppointmentStatus::Completed => self.completed += 1,
            AppointmentStatus::Cancelled => self.cancelled += 1,
            AppointmentStatus::NoShow => self.no_show += 1,
            AppointmentStatus::Booked
            | AppointmentStatus::Confirmed
            | AppointmentStatus::Rescheduled => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    /// Normalised national number, unique
    pub phone: String,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub preferred_language: Option<Language>,
    pub stats: PatientStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 6] = [
        AppointmentStatus::Booked,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
        AppointmentStatus::Rescheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "booked",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    /// Booked or confirmed: the visit has not happened yet
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Booked | AppointmentStatus::Confirmed)
    }

    /// Every status except `cancelled` keeps the (doctor, date, time) slot
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Booked, Confirmed)
                | (Confirmed, Completed)
                | (Booked | Confirmed, Cancelled | NoShow | Rescheduled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AppointmentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == wanted)
            .ok_or_else(|| format!("unknown appointment status: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingChannel {
    Voice,
    Manual,
}

impl BookingChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingChannel::Voice => "voice",
            BookingChannel::Manual => "manual",
        }
    }
}

impl FromStr for BookingChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice" => Ok(BookingChannel::Voice),
            "manual" => Ok(BookingChannel::Manual),
            other => Err(format!("unknown booking channel: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    /// `PREFIX-YYYYMMDD-NNNN`, sequential per booking day
    pub appointment_number: String,
    pub hospital_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub patient_phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub specialty: Specialty,
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub language: Language,
    pub channel: BookingChannel,
    /// Call id of the conversation that produced the booking
    pub call_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller identity used to find or create the patient at commit time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientIdentity {
    pub phone: String,
    pub name: Option<String>,
    pub language: Option<Language>,
}

/// Everything the store needs to commit a booking in one atomic step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    pub hospital_id: Uuid,
    pub doctor_id: Uuid,
    pub specialty: Specialty,
    pub patient: PatientIdentity,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub language: Language,
    pub channel: BookingChannel,
    pub call_id: Option<String>,
    pub number_prefix: String,
    /// Clinic-local day the booking is made; drives the number sequence
    pub booked_on: NaiveDate,
}

/// Result of a committed booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookedAppointment {
    pub appointment: Appointment,
    pub patient: Patient,
}

pub fn format_appointment_number(prefix: &str, booked_on: NaiveDate, sequence: u32) -> String {
    format!("{}-{}-{:04}", prefix, booked_on.format("%Y%m%d"), sequence)
}
