// Test helpers shared by the store's unit tests
use chrono::{NaiveDate, NaiveTime};

use crate::demo;
use crate::memory::InMemoryScheduleRepository;
use crate::models::{normalize_phone, Doctor, Hospital};
use crate::repository::ScheduleRepository;

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

/// 2026-02-09, a Monday
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
}

pub fn hospital(slug: &str, inbound: &str) -> Hospital {
    let mut hospital = demo::city_care_hospital().unwrap();
    hospital.slug = slug.to_string();
    hospital.name = format!("Hospital {slug}");
    hospital.inbound_number = normalize_phone(inbound);
    hospital
}

/// Demo hospital plus Dr. Rajesh Sharma (general, Mon-Sat)
pub async fn seed_one(repo: &InMemoryScheduleRepository) -> (Hospital, Doctor) {
    let tenant = demo::seed(repo).await.unwrap();
    let doctor = tenant.doctor_named("Rajesh").unwrap().clone();
    (tenant.hospital, doctor)
}
