//! Demo tenant: one hospital with six doctors.
//!
//! Used by `mediconnect-server --seed-demo` and by the integration tests.

use chrono::{NaiveTime, Utc, Weekday};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::*;
use crate::repository::ScheduleRepository;

pub const DEMO_INBOUND_NUMBER: &str = "01140036376";

const MON_SAT: [Weekday; 6] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

fn hm(hour: u32, minute: u32) -> StoreResult<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| StoreError::InvalidSchedule(format!("bad time {hour}:{minute}")))
}

/// The same `(start, end)` pairs on each listed day
fn weekly(days: &[Weekday], windows: &[((u32, u32), (u32, u32))]) -> StoreResult<WeeklySchedule> {
    let mut all = Vec::with_capacity(days.len() * windows.len());
    for day in days {
        for ((sh, sm), (eh, em)) in windows {
            all.push(AvailabilityWindow::new(*day, hm(*sh, *sm)?, hm(*eh, *em)?));
        }
    }
    WeeklySchedule::new(all)
}

pub fn city_care_hospital() -> StoreResult<Hospital> {
    let now = Utc::now();
    Ok(Hospital {
        id: Uuid::new_v4(),
        name: "City Care Hospital".to_string(),
        slug: "city-care-hospital".to_string(),
        phone_number: DEMO_INBOUND_NUMBER.to_string(),
        inbound_number: normalize_phone(DEMO_INBOUND_NUMBER),
        address: Some("123 MG Road, Sector 15, Noida, UP 201301".to_string()),
        email: Some("info@citycarehospital.in".to_string()),
        working_hours: WorkingHours {
            start: hm(9, 0)?,
            end: hm(21, 0)?,
        },
        working_days: MON_SAT.to_vec(),
        default_language: Language::Hindi,
        greetings: Greetings {
            hindi: "नमस्ते! सिटी केयर हॉस्पिटल में आपका स्वागत है। मैं आपकी कैसे मदद कर सकती हूं?"
                .to_string(),
            english: "Hello! Welcome to City Care Hospital. How can I help you today?".to_string(),
        },
        cost_per_call: 50,
        currency: "INR".to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    })
}

fn doctor(
    hospital_id: Uuid,
    name: &str,
    specialty: Specialty,
    qualification: &str,
    fee: i64,
    schedule: WeeklySchedule,
) -> Doctor {
    let now = Utc::now();
    Doctor {
        id: Uuid::new_v4(),
        hospital_id,
        name: name.to_string(),
        specialty,
        qualification: Some(qualification.to_string()),
        experience_years: 10,
        consultation_fee: fee,
        languages: vec![Language::Hindi, Language::English],
        schedule,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn city_care_doctors(hospital_id: Uuid) -> StoreResult<Vec<Doctor>> {
    use Weekday::*;
    Ok(vec![
        doctor(
            hospital_id,
            "Dr. Rajesh Sharma",
            Specialty::General,
            "General Physician & Internal Medicine",
            500,
            weekly(&MON_SAT, &[((9, 0), (12, 0)), ((14, 0), (17, 0))])?,
        ),
        doctor(
            hospital_id,
            "Dr. Priya Patel",
            Specialty::Cardiology,
            "Interventional Cardiologist",
            1000,
            weekly(&[Mon, Wed, Fri], &[((10, 0), (12, 0)), ((15, 0), (17, 0))])?,
        ),
        doctor(
            hospital_id,
            "Dr. Amit Kumar",
            Specialty::Orthopedics,
            "Joint Replacement & Sports Medicine",
            800,
            weekly(&[Tue, Thu, Sat], &[((9, 0), (11, 30)), ((14, 0), (16, 0))])?,
        ),
        doctor(
            hospital_id,
            "Dr. Sunita Verma",
            Specialty::Gynecology,
            "Obstetrics & Gynecology",
            700,
            weekly(&[Mon, Tue, Thu, Fri], &[((10, 0), (12, 0)), ((16, 0), (18, 0))])?,
        ),
        doctor(
            hospital_id,
            "Dr. Vikram Singh",
            Specialty::Dermatology,
            "Skin & Hair Specialist",
            600,
            weekly(&[Mon, Wed, Fri, Sat], &[((11, 0), (12, 30)), ((17, 0), (19, 0))])?,
        ),
        doctor(
            hospital_id,
            "Dr. Neha Gupta",
            Specialty::Pediatrics,
            "Child Specialist & Neonatologist",
            600,
            weekly(&MON_SAT, &[((9, 0), (11, 30)), ((16, 0), (18, 30))])?,
        ),
    ])
}

/// Ids of the seeded records
#[derive(Debug, Clone)]
pub struct DemoTenant {
    pub hospital: Hospital,
    pub doctors: Vec<Doctor>,
}

impl DemoTenant {
    pub fn doctor_named(&self, fragment: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.name.contains(fragment))
    }
}

/// Insert the demo hospital and its doctors
pub async fn seed<R: ScheduleRepository + ?Sized>(repo: &R) -> StoreResult<DemoTenant> {
    let hospital = repo.insert_hospital(city_care_hospital()?).await?;
    let mut doctors = Vec::new();
    for doctor in city_care_doctors(hospital.id)? {
        doctors.push(repo.insert_doctor(doctor).await?);
    }
    tracing::info!(
        hospital = %hospital.name,
        doctors = doctors.len(),
        "Seeded demo tenant"
    );
    Ok(DemoTenant { hospital, doctors })
}
