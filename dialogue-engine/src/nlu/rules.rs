//! Deterministic slot filler for English, Hindi and Hinglish callers.
//!
//! Recognises departments and symptoms, doctor names from the catalog,
//! relative and named dates, clock times, the caller's name, yes/no,
//! picks from the last offered slots, cancellation and requests for a
//! human. Needs no network and is the default backend.

// Pattern literals are compiled once and are known-valid.
#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use booking_engine::{slots, SlotAvailability, SlotOption};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use schedule_store::{Doctor, Specialty};
use std::sync::Arc;

use crate::dates::{has_any, parse_time, resolve_date, tokens};
use crate::error::NluResult;
use crate::fields::{BookingFields, ExtractedFields, MissingField};
use crate::nlu::{AvailabilitySource, BackendReply, NluBackend, NluContext};
use crate::phrases;
use crate::state::DialogueState;

lazy_static! {
    static ref NAME_EN: Regex =
        Regex::new(r"(?i)\b(?:my name is|name is|this is)\s+([a-z]+(?:\s+[a-z]+)?)").unwrap();
    static ref NAME_HINGLISH: Regex =
        Regex::new(r"(?i)\b(?:mera|meraa|mere)\s+naam\s+([a-z]+(?:\s+[a-z]+)?)").unwrap();
    static ref NAME_HI: Regex = Regex::new(r"नाम\s+(\S+)(?:\s+(\S+))?\s+है").unwrap();
}

/// Alias lists per department; a trailing `*` matches as a word prefix
const SPECIALTY_ALIASES: &[(Specialty, &[&str])] = &[
    (
        Specialty::Cardiology,
        &["cardi*", "heart", "dil", "दिल", "हृदय", "bp", "chest", "seene", "सीने"],
    ),
    (
        Specialty::Orthopedics,
        &[
            "ortho*", "bone*", "haddi", "हड्डी", "joint*", "knee", "ghutna", "ghutne", "घुटने",
            "fracture", "kamar", "कमर",
        ],
    ),
    (
        Specialty::Gynecology,
        &["gyn*", "gaina*", "pregnan*", "स्त्री", "mahila", "period*", "delivery", "garbh*"],
    ),
    (
        Specialty::Dermatology,
        &["derma*", "skin", "twacha", "त्वचा", "chamdi", "rash", "acne", "khujli", "खुजली"],
    ),
    (
        Specialty::Pediatrics,
        &["pediatric*", "paediatric*", "child*", "baby", "kids", "bachch*", "बच्च*", "शिशु"],
    ),
    (
        Specialty::Ent,
        &["ent", "ear", "ears", "kaan", "कान", "nose", "naak", "नाक", "throat", "gala", "गला", "गले"],
    ),
    (
        Specialty::Dentistry,
        &["dent*", "teeth", "tooth", "daant", "dant", "दांत", "दाँत"],
    ),
    (
        Specialty::Neurology,
        &["neuro*", "brain", "dimag", "दिमाग", "migraine", "paralysis", "lakwa", "seizure*", "mirgi"],
    ),
    (
        Specialty::Ophthalmology,
        &["eye*", "aankh*", "ankh*", "आंख*", "आँख*", "ophthal*", "vision", "nazar"],
    ),
    (
        Specialty::General,
        &[
            "general", "physician", "fever", "bukhar", "बुखार", "cold", "sardi", "सर्दी", "khansi",
            "खांसी", "weakness", "kamzori", "सामान्य",
        ],
    ),
];

const HUMAN: &[&str] = &[
    "human", "receptionist", "reception", "operator", "insaan", "staff", "transfer", "agent",
    "रिसेप्शन", "इंसान",
];
const CANCEL: &[&str] = &["cancel", "radd", "रद्द", "कैंसिल", "cancellation"];
const GOODBYE: &[&str] = &["bye", "goodbye", "alvida", "अलविदा"];
const AFFIRM: &[&str] = &[
    "yes", "yeah", "yep", "haan", "haa", "han", "hanji", "ji", "theek", "thik", "ok", "okay",
    "sure", "confirm", "karo", "kijiye", "हाँ", "हां", "जी", "ठीक", "बिल्कुल", "करो", "कीजिए", "करें",
];
const DENY: &[&str] = &[
    "no", "nahi", "nahin", "nai", "mat", "wrong", "galat", "नहीं", "नही", "मत", "गलत",
];
const ORDINALS: &[(usize, &[&str])] = &[
    (0, &["first", "pehla", "pehle", "pahla", "pehli", "पहला", "पहले", "पहली"]),
    (1, &["second", "doosra", "dusra", "doosre", "dusre", "दूसरा", "दूसरे", "दूसरी"]),
    (2, &["third", "teesra", "tisra", "teesre", "तीसरा", "तीसरे", "तीसरी"]),
];
/// Filler words that trail a spoken name
const NAME_STOPWORDS: &[&str] = &["hai", "h", "he", "hoon", "hu", "ji", "and", "aur"];

fn alias_matches(alias: &str, word: &str) -> bool {
    match alias.strip_suffix('*') {
        Some(prefix) => word.starts_with(prefix),
        None => word == alias,
    }
}

/// Department named or implied by symptoms, first match in table order
pub fn detect_specialty(words: &[String]) -> Option<Specialty> {
    SPECIALTY_ALIASES
        .iter()
        .find(|(_, aliases)| {
            words
                .iter()
                .any(|w| aliases.iter().any(|a| alias_matches(a, w)))
        })
        .map(|(specialty, _)| *specialty)
}

fn ordinal_choice(words: &[String]) -> Option<usize> {
    ORDINALS
        .iter()
        .find(|(_, names)| has_any(words, names))
        .map(|(index, _)| *index)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn clean_name(raw: &str) -> Option<String> {
    let words: Vec<String> = raw
        .split_whitespace()
        .filter(|w| !NAME_STOPWORDS.contains(&w.to_lowercase().as_str()))
        .map(title_case)
        .collect();
    (!words.is_empty()).then(|| words.join(" "))
}

/// "my name is Ramesh", "mera naam Ramesh hai", "मेरा नाम रमेश है"
pub fn extract_name(text: &str) -> Option<String> {
    if let Some(caps) = NAME_HI.captures(text) {
        let mut name = caps.get(1)?.as_str().to_string();
        if let Some(second) = caps.get(2) {
            name.push(' ');
            name.push_str(second.as_str());
        }
        return Some(name);
    }
    [&*NAME_EN, &*NAME_HINGLISH]
        .iter()
        .find_map(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .and_then(|m| clean_name(m.as_str()))
}

/// The utterance with any self-introduction blanked out, so a caller's
/// surname is never mistaken for a doctor's
fn without_name(text: &str) -> String {
    [&*NAME_HI, &*NAME_EN, &*NAME_HINGLISH]
        .iter()
        .fold(text.to_string(), |acc, re| re.replace_all(&acc, " ").into_owned())
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn hh_mm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

fn reply(response: String, next_state: &str, action: &str) -> BackendReply {
    BackendReply {
        response_text: response,
        next_state: next_state.to_string(),
        action: action.to_string(),
        ..BackendReply::default()
    }
}

/// Rule-based backend
pub struct RuleBasedNlu {
    availability: Option<Arc<dyn AvailabilitySource>>,
    slot_minutes: u32,
    max_offers: usize,
}

impl Default for RuleBasedNlu {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBasedNlu {
    /// Offers slots from the weekly template only, ignoring existing bookings
    pub fn new() -> Self {
        Self {
            availability: None,
            slot_minutes: 30,
            max_offers: 3,
        }
    }

    /// Offer slots that are actually open
    pub fn with_availability(mut self, source: Arc<dyn AvailabilitySource>) -> Self {
        self.availability = Some(source);
        self
    }

    pub fn with_slot_minutes(mut self, minutes: u32) -> Self {
        self.slot_minutes = minutes;
        self
    }

    pub fn with_max_offers(mut self, count: usize) -> Self {
        self.max_offers = count.max(1);
        self
    }

    async fn availability(
        &self,
        doctor: &Doctor,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> NluResult<SlotAvailability> {
        if let Some(source) = &self.availability {
            return source.availability(doctor.id, date).await;
        }
        if !doctor.schedule.works_on(date.weekday()) {
            return Ok(SlotAvailability::NotAvailableThatDay);
        }
        Ok(SlotAvailability::Open(slots::open_slots(
            &doctor.schedule,
            date,
            self.slot_minutes,
            &[],
            now,
        )))
    }

    /// Choose the next question once this turn's extractions are known
    async fn next_step(
        &self,
        ctx: &NluContext,
        mut extracted: ExtractedFields,
        projected: &BookingFields,
    ) -> NluResult<BackendReply> {
        let language = ctx.language;
        let today = ctx.today();
        let doctor = projected.doctor_id.and_then(|id| ctx.catalog.find_by_id(id));

        if let (Some(doctor), Some(date)) = (doctor, projected.preferred_date) {
            match self.availability(doctor, date, ctx.now).await? {
                SlotAvailability::NotAvailableThatDay => {
                    extracted.preferred_date = None;
                    extracted.preferred_time = None;
                    let text = phrases::not_available_that_day(
                        language,
                        &doctor.name,
                        date,
                        today,
                        &doctor.schedule.working_days(),
                    );
                    return Ok(BackendReply {
                        extracted_data: extracted,
                        ..reply(text, "collecting_info", "none")
                    });
                }
                SlotAvailability::Open(open) if open.is_empty() => {
                    extracted.preferred_date = None;
                    extracted.preferred_time = None;
                    let text = phrases::fully_booked(language, &doctor.name, date, today);
                    return Ok(BackendReply {
                        extracted_data: extracted,
                        ..reply(text, "collecting_info", "none")
                    });
                }
                SlotAvailability::Open(open) => {
                    let wanted = projected.preferred_time;
                    if wanted.map_or(true, |t| !open.contains(&t)) {
                        extracted.preferred_time = None;
                        let ordered = match wanted {
                            Some(t) => slots::nearest_first(open, t),
                            None => open,
                        };
                        let offered: Vec<SlotOption> = ordered
                            .into_iter()
                            .take(self.max_offers)
                            .map(|time| SlotOption { date, time })
                            .collect();
                        let text = phrases::offer_slots(language, &doctor.name, &offered, today);
                        return Ok(BackendReply {
                            extracted_data: extracted,
                            offered_slots: offered,
                            ..reply(text, "collecting_info", "none")
                        });
                    }
                }
            }
        }

        let (text, state) = match projected.missing().first() {
            Some(MissingField::Department) => (
                phrases::ask_department(language, &ctx.catalog.specialties()),
                "collecting_info",
            ),
            Some(MissingField::Date) => match doctor {
                Some(doctor) => (
                    phrases::ask_date(language, &doctor.name, &doctor.schedule.working_days()),
                    "collecting_info",
                ),
                None => (phrases::ask_new_slot(language), "collecting_info"),
            },
            Some(MissingField::Time) => (phrases::ask_new_slot(language), "collecting_info"),
            Some(MissingField::PatientName) => (phrases::ask_name(language), "collecting_info"),
            None => match (doctor, projected.preferred_date, projected.preferred_time) {
                (Some(doctor), Some(date), Some(time)) => (
                    phrases::confirm_booking(
                        language,
                        projected.patient_name.as_deref().unwrap_or_default(),
                        &doctor.name,
                        date,
                        time,
                        today,
                    ),
                    "confirming",
                ),
                _ => (phrases::ask_new_slot(language), "collecting_info"),
            },
        };

        Ok(BackendReply {
            extracted_data: extracted,
            ..reply(text, state, "none")
        })
    }
}

#[async_trait]
impl NluBackend for RuleBasedNlu {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn interpret(&self, ctx: &NluContext) -> NluResult<BackendReply> {
        let language = ctx.language;
        let today = ctx.today();
        let utterance = ctx.utterance.trim();
        let words = tokens(utterance);
        let confirming = ctx.state == DialogueState::Confirming;

        if has_any(&words, HUMAN) {
            return Ok(reply(
                phrases::transfer_to_human(language),
                "transfer_to_human",
                "transfer_to_human",
            ));
        }

        let denied = has_any(&words, DENY);
        let affirmed = !denied && has_any(&words, AFFIRM);

        if has_any(&words, CANCEL) && !confirming {
            return Ok(reply(phrases::cancelling(language), "ended", "cancel_appointment"));
        }
        if has_any(&words, GOODBYE) {
            return Ok(reply(phrases::goodbye(language), "ended", "none"));
        }

        let mut extracted = ExtractedFields::default();
        let mut projected = ctx.fields.clone();
        let topic = without_name(utterance);
        let topic_words = tokens(&topic);

        let mut choose = |doctor: &Doctor, extracted: &mut ExtractedFields| {
            extracted.doctor_id = Some(doctor.id.to_string());
            extracted.doctor_name = Some(doctor.name.clone());
            extracted.department = Some(doctor.specialty.as_str().to_string());
            projected.doctor_id = Some(doctor.id);
            projected.doctor_name = Some(doctor.name.clone());
            projected.specialty = Some(doctor.specialty);
        };

        if let Some(doctor) = ctx.catalog.find_in_text(&topic) {
            choose(doctor, &mut extracted);
        } else if let Some(specialty) = detect_specialty(&topic_words) {
            if !ctx.catalog.offers(specialty) {
                return Ok(reply(
                    phrases::department_not_offered(
                        language,
                        specialty,
                        &ctx.catalog.specialties(),
                    ),
                    "collecting_info",
                    "none",
                ));
            }
            let current = ctx.fields.doctor_id.and_then(|id| ctx.catalog.find_by_id(id));
            if current.map_or(true, |d| d.specialty != specialty) {
                if let Some(doctor) = ctx.catalog.by_specialty(specialty).next() {
                    choose(doctor, &mut extracted);
                }
            }
            if ctx.fields.symptoms.is_none() {
                extracted.symptoms = Some(utterance.to_string());
            }
        }

        // A pick from the slots read out last turn wins over free-form dates
        let picked = match ordinal_choice(&words) {
            Some(index) => ctx.last_offered.get(index),
            None if affirmed && !confirming => ctx.last_offered.first(),
            None => None,
        };
        if let Some(slot) = picked.copied() {
            extracted.preferred_date = Some(iso(slot.date));
            extracted.preferred_time = Some(hh_mm(slot.time));
            projected.preferred_date = Some(slot.date);
            projected.preferred_time = Some(slot.time);
        } else {
            if let Some(date) = resolve_date(utterance, today).filter(|d| *d >= today) {
                extracted.preferred_date = Some(iso(date));
                projected.preferred_date = Some(date);
            }
            if let Some(time) = parse_time(utterance) {
                extracted.preferred_time = Some(hh_mm(time));
                projected.preferred_time = Some(time);
            }
        }

        let asked_for_name = ctx.fields.missing().first() == Some(&MissingField::PatientName);
        let name = extract_name(utterance).or_else(|| {
            // A short bare answer right after being asked for a name
            let bare = asked_for_name
                && extracted == ExtractedFields::default()
                && !affirmed
                && !denied
                && (1..=3).contains(&words.len());
            bare.then(|| clean_name(utterance)).flatten()
        });
        if let Some(name) = name {
            projected.patient_name = Some(name.clone());
            extracted.patient_name = Some(name);
        }

        if confirming && extracted == ExtractedFields::default() {
            if affirmed && projected.is_ready() {
                return Ok(reply(
                    phrases::booking_now(language),
                    "booked",
                    "book_appointment",
                ));
            }
            if denied || has_any(&words, CANCEL) {
                return Ok(reply(phrases::ask_new_slot(language), "collecting_info", "none"));
            }
        }

        self.next_step(ctx, extracted, &projected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DoctorCatalog;
    use booking_engine::FixedClock;
    use booking_engine::Clock;
    use schedule_store::{demo, Language};
    use uuid::Uuid;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // Sunday evening; tomorrow is Monday 9 February
    fn now() -> NaiveDateTime {
        FixedClock::at(NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(), t(20, 0)).now()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
    }

    fn context(utterance: &str, language: Language) -> NluContext {
        NluContext {
            call_id: "CA1".into(),
            language,
            hospital_name: Some("City Care Hospital".into()),
            caller_number: "9876543210".into(),
            utterance: utterance.into(),
            history: Vec::new(),
            fields: BookingFields::default(),
            state: DialogueState::Listening,
            catalog: Arc::new(DoctorCatalog::new(
                demo::city_care_doctors(Uuid::new_v4()).unwrap(),
            )),
            now: now(),
            turn: 1,
            max_turns: 6,
            max_words: 50,
            last_offered: Vec::new(),
        }
    }

    #[test]
    fn symptoms_map_to_departments() {
        let detect = |s: &str| detect_specialty(&tokens(s));
        assert_eq!(detect("mujhe dil ki problem hai"), Some(Specialty::Cardiology));
        assert_eq!(detect("मेरे बच्चे को बुखार है"), Some(Specialty::Pediatrics));
        assert_eq!(detect("knee pain since a week"), Some(Specialty::Orthopedics));
        assert_eq!(detect("aankhon mein jalan"), Some(Specialty::Ophthalmology));
        assert_eq!(detect("I need an appointment"), None);
    }

    #[test]
    fn names_in_three_registers() {
        assert_eq!(extract_name("my name is ramesh kumar").as_deref(), Some("Ramesh Kumar"));
        assert_eq!(extract_name("mera naam Sita hai").as_deref(), Some("Sita"));
        assert_eq!(extract_name("मेरा नाम रमेश है").as_deref(), Some("रमेश"));
        assert_eq!(extract_name("kal aana hai"), None);
    }

    #[tokio::test]
    async fn cardiology_and_tomorrow_offers_the_first_open_slots() {
        let ctx = context("mujhe dil ke doctor ko dikhana hai, kal", Language::Hindi);
        let reply = RuleBasedNlu::new().interpret(&ctx).await.unwrap();

        assert_eq!(reply.next_state, "collecting_info");
        assert_eq!(reply.extracted_data.department.as_deref(), Some("cardiology"));
        assert_eq!(reply.extracted_data.doctor_name.as_deref(), Some("Dr. Priya Patel"));
        assert_eq!(reply.extracted_data.preferred_date.as_deref(), Some("2026-02-09"));
        assert_eq!(
            reply.offered_slots,
            vec![
                SlotOption { date: monday(), time: t(10, 0) },
                SlotOption { date: monday(), time: t(10, 30) },
                SlotOption { date: monday(), time: t(11, 0) },
            ]
        );
        assert!(reply.response_text.contains("Dr. Priya Patel"));
    }

    #[tokio::test]
    async fn accepting_the_offer_takes_the_first_slot_then_asks_for_a_name() {
        let mut ctx = context("haan pehla wala theek hai", Language::Hindi);
        ctx.fields.specialty = Some(Specialty::Cardiology);
        let priya = ctx.catalog.by_specialty(Specialty::Cardiology).next().unwrap().clone();
        ctx.fields.doctor_id = Some(priya.id);
        ctx.fields.doctor_name = Some(priya.name.clone());
        ctx.fields.preferred_date = Some(monday());
        ctx.last_offered = vec![
            SlotOption { date: monday(), time: t(10, 0) },
            SlotOption { date: monday(), time: t(10, 30) },
        ];

        let reply = RuleBasedNlu::new().interpret(&ctx).await.unwrap();

        assert_eq!(reply.extracted_data.preferred_time.as_deref(), Some("10:00"));
        assert_eq!(reply.response_text, phrases::ask_name(Language::Hindi));
    }

    #[tokio::test]
    async fn unknown_department_is_declined_without_naming_a_doctor() {
        let ctx = context("I need a neurologist for my migraine", Language::English);
        let reply = RuleBasedNlu::new().interpret(&ctx).await.unwrap();

        assert_eq!(reply.next_state, "collecting_info");
        assert!(reply.extracted_data.doctor_id.is_none());
        assert!(reply.response_text.starts_with("Sorry, we do not have a Neurology department"));
        assert!(ctx.catalog.unknown_doctor_mentions(&reply.response_text).is_empty());
    }

    #[tokio::test]
    async fn doctor_off_that_day_is_explained() {
        // Dr. Priya Patel does not sit on Tuesdays
        let ctx = context("Dr. Priya Patel on tuesday please", Language::English);
        let reply = RuleBasedNlu::new().interpret(&ctx).await.unwrap();

        assert!(reply.extracted_data.preferred_date.is_none());
        assert!(reply.response_text.contains("is not available"));
        assert!(reply.response_text.contains("Monday, Wednesday, Friday"));
    }

    #[tokio::test]
    async fn confirmation_yes_books() {
        let mut ctx = context("yes please", Language::English);
        let priya = ctx.catalog.by_specialty(Specialty::Cardiology).next().unwrap().clone();
        ctx.state = DialogueState::Confirming;
        ctx.fields = BookingFields {
            patient_name: Some("Ramesh".into()),
            patient_phone: Some("9876543210".into()),
            specialty: Some(Specialty::Cardiology),
            doctor_id: Some(priya.id),
            doctor_name: Some(priya.name),
            preferred_date: Some(monday()),
            preferred_time: Some(t(10, 0)),
            symptoms: None,
        };

        let reply = RuleBasedNlu::new().interpret(&ctx).await.unwrap();
        assert_eq!(reply.next_state, "booked");
        assert_eq!(reply.action, "book_appointment");
    }

    #[tokio::test]
    async fn caller_surname_is_not_a_doctor() {
        let mut ctx = context("my name is Ramesh Kumar", Language::English);
        let priya = ctx.catalog.by_specialty(Specialty::Cardiology).next().unwrap().clone();
        ctx.fields.doctor_id = Some(priya.id);
        ctx.fields.doctor_name = Some(priya.name);
        ctx.fields.preferred_date = Some(monday());
        ctx.fields.preferred_time = Some(t(10, 0));

        let reply = RuleBasedNlu::new().interpret(&ctx).await.unwrap();

        assert!(reply.extracted_data.doctor_id.is_none());
        assert_eq!(reply.extracted_data.patient_name.as_deref(), Some("Ramesh Kumar"));
        assert_eq!(reply.next_state, "confirming");
    }

    #[tokio::test]
    async fn human_and_cancel_requests() {
        let human = RuleBasedNlu::new()
            .interpret(&context("reception se baat karao", Language::Hindi))
            .await
            .unwrap();
        assert_eq!(human.action, "transfer_to_human");

        let cancel = RuleBasedNlu::new()
            .interpret(&context("I want to cancel my appointment", Language::English))
            .await
            .unwrap();
        assert_eq!(cancel.action, "cancel_appointment");
    }
}
