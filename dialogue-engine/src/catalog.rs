// Pattern literals are compiled once and are known-valid.
#![allow(clippy::unwrap_used)]

use chrono::Weekday;
use lazy_static::lazy_static;
use regex::Regex;
use schedule_store::{Doctor, Specialty};
use serde::Serialize;
use uuid::Uuid;

lazy_static! {
    // "Dr. Mehta", "Doctor Anand"; the name word must be capitalised
    static ref DOCTOR_MENTION: Regex =
        Regex::new(r"\b(?:Dr\.?|DR\.?|dr\.?|Doctor|doctor)\s+([A-Z][a-zA-Z]+)").unwrap();
}

/// Words that follow "doctor" in ordinary speech without naming anyone
const NOT_A_NAME: &[&str] = &["Sahab", "Saheb", "Ji", "Appointment", "Available"];

fn name_words(name: &str) -> impl Iterator<Item = String> + '_ {
    name.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty() && w != "dr" && w != "doctor" && w != "डॉ")
}

/// The active doctors of one hospital: the only names a dialogue may use
#[derive(Debug, Clone, Default)]
pub struct DoctorCatalog {
    doctors: Vec<Doctor>,
}

#[derive(Debug, Serialize)]
struct PromptDoctor<'a> {
    id: Uuid,
    name: &'a str,
    department: &'static str,
    specialization: Option<&'a str>,
    #[serde(rename = "consultationFee")]
    consultation_fee: i64,
    #[serde(rename = "availableDays")]
    available_days: Vec<String>,
    #[serde(rename = "availableSlots")]
    available_slots: Vec<String>,
}

impl DoctorCatalog {
    pub fn new(doctors: Vec<Doctor>) -> Self {
        let doctors = doctors.into_iter().filter(|d| d.is_active).collect();
        Self { doctors }
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn is_empty(&self) -> bool {
        self.doctors.is_empty()
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == id)
    }

    /// Match a spoken or written doctor name.
    ///
    /// Honorifics are ignored and a single distinctive word ("Priya",
    /// "Patel") is enough, as long as it picks out exactly one doctor.
    pub fn find_by_name(&self, spoken: &str) -> Option<&Doctor> {
        let wanted: Vec<String> = name_words(spoken).collect();
        if wanted.is_empty() {
            return None;
        }

        let full = wanted.join(" ");
        if let Some(exact) = self
            .doctors
            .iter()
            .find(|d| name_words(&d.name).collect::<Vec<_>>().join(" ") == full)
        {
            return Some(exact);
        }

        let mut hits = self
            .doctors
            .iter()
            .filter(|d| name_words(&d.name).any(|w| wanted.contains(&w)));
        match (hits.next(), hits.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    /// A doctor named anywhere in free text
    pub fn find_in_text(&self, text: &str) -> Option<&Doctor> {
        let spoken: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let mut hits = self
            .doctors
            .iter()
            .filter(|d| name_words(&d.name).any(|w| spoken.contains(&w)));
        match (hits.next(), hits.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    pub fn by_specialty(&self, specialty: Specialty) -> impl Iterator<Item = &Doctor> + '_ {
        self.doctors.iter().filter(move |d| d.specialty == specialty)
    }

    pub fn offers(&self, specialty: Specialty) -> bool {
        self.by_specialty(specialty).next().is_some()
    }

    /// Departments with at least one doctor, in a stable order
    pub fn specialties(&self) -> Vec<Specialty> {
        let mut all: Vec<Specialty> = self.doctors.iter().map(|d| d.specialty).collect();
        all.sort();
        all.dedup();
        all
    }

    /// Capitalised names after "Dr."/"Doctor" in `text` that match no doctor here
    pub fn unknown_doctor_mentions(&self, text: &str) -> Vec<String> {
        DOCTOR_MENTION
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|word| !NOT_A_NAME.contains(word))
            .filter(|word| {
                let lower = word.to_lowercase();
                !self
                    .doctors
                    .iter()
                    .any(|d| name_words(&d.name).any(|w| w == lower))
            })
            .map(str::to_string)
            .collect()
    }

    /// The catalog as handed to a generative backend
    pub fn prompt_json(&self) -> String {
        let entries: Vec<PromptDoctor<'_>> = self
            .doctors
            .iter()
            .map(|d| PromptDoctor {
                id: d.id,
                name: &d.name,
                department: d.specialty.as_str(),
                specialization: d.qualification.as_deref(),
                consultation_fee: d.consultation_fee,
                available_days: d
                    .schedule
                    .working_days()
                    .into_iter()
                    .map(weekday_name)
                    .map(str::to_string)
                    .collect(),
                available_slots: d
                    .schedule
                    .windows()
                    .iter()
                    .map(|w| {
                        format!(
                            "{} {}-{}",
                            weekday_name(w.weekday),
                            w.start.format("%H:%M"),
                            w.end.format("%H:%M")
                        )
                    })
                    .collect(),
            })
            .collect();
        serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schedule_store::demo;

    fn catalog() -> DoctorCatalog {
        DoctorCatalog::new(demo::city_care_doctors(Uuid::new_v4()).unwrap())
    }

    #[test]
    fn names_match_with_or_without_honorifics() {
        let catalog = catalog();
        assert_eq!(
            catalog.find_by_name("Dr. Priya Patel").unwrap().specialty,
            Specialty::Cardiology
        );
        assert_eq!(
            catalog.find_by_name("patel").unwrap().specialty,
            Specialty::Cardiology
        );
        assert!(catalog.find_by_name("Dr. House").is_none());
        assert!(catalog.find_by_name("Dr.").is_none());
    }

    #[test]
    fn free_text_mentions() {
        let catalog = catalog();
        let doctor = catalog
            .find_in_text("mujhe Neha ji se milna hai")
            .unwrap();
        assert_eq!(doctor.specialty, Specialty::Pediatrics);
        assert!(catalog.find_in_text("koi bhi doctor chalega").is_none());
    }

    #[test]
    fn invented_doctors_are_detected() {
        let catalog = catalog();
        assert!(catalog
            .unknown_doctor_mentions("Dr. Priya Patel is free tomorrow at 10 AM")
            .is_empty());
        assert_eq!(
            catalog.unknown_doctor_mentions("Dr. Mehta from Neurology can see you"),
            vec!["Mehta".to_string()]
        );
        assert!(catalog
            .unknown_doctor_mentions("which doctor would you like?")
            .is_empty());
    }

    #[test]
    fn specialties_are_distinct_and_sorted() {
        let catalog = catalog();
        let specialties = catalog.specialties();
        assert_eq!(specialties.len(), 6);
        assert!(catalog.offers(Specialty::Cardiology));
        assert!(!catalog.offers(Specialty::Neurology));
    }

    #[test]
    fn prompt_lists_every_doctor_once() {
        let json: serde_json::Value = serde_json::from_str(&catalog().prompt_json()).unwrap();
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 6);
        assert!(entries.iter().any(|e| e["name"] == "Dr. Priya Patel"
            && e["department"] == "cardiology"
            && e["availableDays"] == serde_json::json!(["Monday", "Wednesday", "Friday"])));
    }
}
