//! Everything the assistant says, in Hindi and English.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use schedule_store::{Language, Specialty};

use booking_engine::SlotOption;

fn pick(language: Language, hindi: String, english: String) -> String {
    match language {
        Language::Hindi => hindi,
        Language::English => english,
    }
}

// ============================================================================
// Dates and times as spoken
// ============================================================================

fn weekday_hi(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "सोमवार",
        Weekday::Tue => "मंगलवार",
        Weekday::Wed => "बुधवार",
        Weekday::Thu => "गुरुवार",
        Weekday::Fri => "शुक्रवार",
        Weekday::Sat => "शनिवार",
        Weekday::Sun => "रविवार",
    }
}

fn month_hi(month: u32) -> &'static str {
    match month {
        1 => "जनवरी",
        2 => "फ़रवरी",
        3 => "मार्च",
        4 => "अप्रैल",
        5 => "मई",
        6 => "जून",
        7 => "जुलाई",
        8 => "अगस्त",
        9 => "सितंबर",
        10 => "अक्टूबर",
        11 => "नवंबर",
        _ => "दिसंबर",
    }
}

/// "tomorrow", "Wednesday, 11 February" / "कल", "बुधवार, 11 फ़रवरी"
pub fn spoken_date(date: NaiveDate, today: NaiveDate, language: Language) -> String {
    let days_ahead = (date - today).num_days();
    match (language, days_ahead) {
        (Language::English, 0) => "today".to_string(),
        (Language::English, 1) => "tomorrow".to_string(),
        (Language::Hindi, 0) => "आज".to_string(),
        (Language::Hindi, 1) => "कल".to_string(),
        (Language::Hindi, 2) => "परसों".to_string(),
        (Language::English, _) => date.format("%A, %-d %B").to_string(),
        (Language::Hindi, _) => format!(
            "{}, {} {}",
            weekday_hi(date.weekday()),
            date.day(),
            month_hi(date.month())
        ),
    }
}

/// "10:30 AM" / "सुबह 10:30 बजे"
pub fn spoken_time(time: NaiveTime, language: Language) -> String {
    match language {
        Language::English => time.format("%-I:%M %p").to_string(),
        Language::Hindi => {
            let part = match time.hour() {
                0..=11 => "सुबह",
                12..=15 => "दोपहर",
                _ => "शाम",
            };
            format!("{part} {} बजे", time.format("%-I:%M"))
        }
    }
}

fn spoken_weekdays(days: &[Weekday], language: Language) -> String {
    days.iter()
        .map(|d| match language {
            Language::Hindi => weekday_hi(*d).to_string(),
            Language::English => crate::catalog::weekday_name(*d).to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn spoken_departments(specialties: &[Specialty], language: Language) -> String {
    specialties
        .iter()
        .map(|s| s.display_name(language))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Call opening
// ============================================================================

pub const LANGUAGE_MENU_HINDI: &str = "हिंदी के लिए एक दबाएं।";
pub const LANGUAGE_MENU_ENGLISH: &str = "For English, press 2.";
pub const LANGUAGE_MENU_RETRY: &str =
    "Please press 1 for Hindi or 2 for English. हिंदी के लिए एक दबाएं।";
pub const NO_LANGUAGE_INPUT: &str = "We did not receive your input. Connecting you in English.";
pub const TECHNICAL_DIFFICULTIES: &str =
    "Sorry, we are experiencing technical difficulties. Please try again later.";

/// Used when the hospital has no greeting of its own
pub fn default_greeting(hospital_name: Option<&str>, language: Language) -> String {
    let name = hospital_name.unwrap_or("MediConnect");
    pick(
        language,
        format!(
            "नमस्ते, {name} में आपका स्वागत है। मैं आपकी अपॉइंटमेंट बुकिंग में मदद कर सकती हूँ। \
             कृपया बताइए आपको किस डॉक्टर से मिलना है या आपकी क्या समस्या है?"
        ),
        format!(
            "Hello, welcome to {name}. I can help you book an appointment. \
             Please tell me which doctor you want to see or describe your health concern."
        ),
    )
}

/// Spoken after the greeting when the record step hears nothing
pub fn could_not_hear(language: Language) -> String {
    pick(
        language,
        "मुझे आपकी बात सुनाई नहीं दी। कृपया दोबारा बोलें।".to_string(),
        "I could not hear you. Please try again.".to_string(),
    )
}

pub fn did_not_understand(language: Language) -> String {
    pick(
        language,
        "मुझे आपकी बात समझ नहीं आई। कृपया दोबारा बोलें।".to_string(),
        "I did not understand. Please try again.".to_string(),
    )
}

// ============================================================================
// Hand-off and endings
// ============================================================================

/// Generic apology for any processing failure
pub fn apology(language: Language) -> String {
    pick(
        language,
        "क्षमा करें, कुछ गड़बड़ हो गई। कृपया दोबारा कोशिश करें या हमारे रिसेप्शन पर कॉल करें।"
            .to_string(),
        "Sorry, something went wrong. Please try again or call our reception directly."
            .to_string(),
    )
}

pub fn no_speech_handoff(language: Language) -> String {
    pick(
        language,
        "माफ़ कीजिए, आपकी आवाज़ नहीं आ रही है। कृपया हमारे रिसेप्शन पर कॉल करें। धन्यवाद।".to_string(),
        "Sorry, I still cannot hear you. Please call our reception directly. Thank you.".to_string(),
    )
}

pub fn transfer_to_human(language: Language) -> String {
    pick(
        language,
        "ठीक है, हमारा रिसेप्शन स्टाफ आपकी मदद करेगा। कृपया रिसेप्शन पर कॉल करें। धन्यवाद।".to_string(),
        "Sure, our reception staff will help you. Please call the reception desk. Thank you."
            .to_string(),
    )
}

pub fn turn_limit(language: Language) -> String {
    pick(
        language,
        "माफ़ कीजिए, मैं आपकी बुकिंग पूरी नहीं कर पाई। हमारा रिसेप्शन आपकी मदद करेगा। धन्यवाद।"
            .to_string(),
        "Sorry, I could not complete your booking. Our reception will help you. Thank you."
            .to_string(),
    )
}

pub fn goodbye(language: Language) -> String {
    pick(
        language,
        "कॉल करने के लिए धन्यवाद। अपना ख्याल रखिए।".to_string(),
        "Thank you for calling. Take care.".to_string(),
    )
}

// ============================================================================
// Slot filling
// ============================================================================

pub fn ask_department(language: Language, offered: &[Specialty]) -> String {
    let list = spoken_departments(offered, language);
    pick(
        language,
        format!("आपको किस विभाग में दिखाना है? हमारे यहां {list} उपलब्ध हैं।"),
        format!("Which department would you like? We have {list}."),
    )
}

pub fn department_not_offered(
    language: Language,
    requested: Specialty,
    offered: &[Specialty],
) -> String {
    let wanted = requested.display_name(language);
    let list = spoken_departments(offered, language);
    pick(
        language,
        format!("माफ़ कीजिए, हमारे यहां {wanted} विभाग नहीं है। हमारे यहां {list} उपलब्ध हैं।"),
        format!("Sorry, we do not have a {wanted} department. We have {list}."),
    )
}

pub fn ask_date(language: Language, doctor_name: &str, working_days: &[Weekday]) -> String {
    let days = spoken_weekdays(working_days, language);
    pick(
        language,
        format!("{doctor_name} {days} को बैठते हैं। आप किस दिन आना चाहेंगे?"),
        format!("{doctor_name} sees patients on {days}. Which day would suit you?"),
    )
}

pub fn not_available_that_day(
    language: Language,
    doctor_name: &str,
    date: NaiveDate,
    today: NaiveDate,
    working_days: &[Weekday],
) -> String {
    let when = spoken_date(date, today, language);
    let days = spoken_weekdays(working_days, language);
    pick(
        language,
        format!("{doctor_name} {when} उपलब्ध नहीं हैं। वे {days} को बैठते हैं। कोई और दिन बताइए।"),
        format!("{doctor_name} is not available {when}. They see patients on {days}. Please choose another day."),
    )
}

pub fn fully_booked(language: Language, doctor_name: &str, date: NaiveDate, today: NaiveDate) -> String {
    let when = spoken_date(date, today, language);
    pick(
        language,
        format!("{doctor_name} के पास {when} कोई समय खाली नहीं है। कोई और दिन बताइए।"),
        format!("{doctor_name} has no free time {when}. Please choose another day."),
    )
}

/// Read out open slots, first one first
pub fn offer_slots(
    language: Language,
    doctor_name: &str,
    slots: &[SlotOption],
    today: NaiveDate,
) -> String {
    let same_day = slots.windows(2).all(|w| matches!(w, [a, b] if a.date == b.date));
    let listed = slots
        .iter()
        .map(|s| {
            if same_day {
                spoken_time(s.time, language)
            } else {
                format!(
                    "{} {}",
                    spoken_date(s.date, today, language),
                    spoken_time(s.time, language)
                )
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    let when = match (same_day, slots.first()) {
        (true, Some(first)) => format!("{} ", spoken_date(first.date, today, language)),
        _ => String::new(),
    };
    pick(
        language,
        format!("{doctor_name} {when}{listed} पर खाली हैं। कौन सा समय ठीक रहेगा?"),
        format!("{doctor_name} is free {when}at {listed}. Which time suits you?"),
    )
}

pub fn ask_name(language: Language) -> String {
    pick(
        language,
        "अपॉइंटमेंट किसके नाम से बुक करूं? कृपया मरीज़ का नाम बताइए।".to_string(),
        "May I have the patient's name for the appointment?".to_string(),
    )
}

pub fn confirm_booking(
    language: Language,
    patient_name: &str,
    doctor_name: &str,
    date: NaiveDate,
    time: NaiveTime,
    today: NaiveDate,
) -> String {
    let when = spoken_date(date, today, language);
    let at = spoken_time(time, language);
    pick(
        language,
        format!("{patient_name} जी, {doctor_name} के साथ {when} {at}। क्या मैं यह अपॉइंटमेंट बुक कर दूं?"),
        format!("{patient_name}, with {doctor_name} {when} at {at}. Shall I book this appointment?"),
    )
}

pub fn ask_new_slot(language: Language) -> String {
    pick(
        language,
        "ठीक है। आप कौन सा दिन और समय चाहेंगे?".to_string(),
        "No problem. Which day and time would you prefer?".to_string(),
    )
}

pub fn booking_now(language: Language) -> String {
    pick(
        language,
        "ठीक है, मैं आपकी अपॉइंटमेंट बुक कर रही हूँ।".to_string(),
        "Alright, booking your appointment now.".to_string(),
    )
}

// ============================================================================
// Booking results
// ============================================================================

pub fn booked(
    language: Language,
    appointment_number: &str,
    doctor_name: &str,
    date: NaiveDate,
    time: NaiveTime,
    today: NaiveDate,
) -> String {
    let when = spoken_date(date, today, language);
    let at = spoken_time(time, language);
    let number = appointment_number.replace('-', " ");
    pick(
        language,
        format!(
            "आपकी अपॉइंटमेंट {doctor_name} के साथ {when} {at} बुक हो गई है। \
             आपका अपॉइंटमेंट नंबर {number} है। धन्यवाद।"
        ),
        format!(
            "Your appointment with {doctor_name} is booked for {when} at {at}. \
             Your appointment number is {number}. Thank you."
        ),
    )
}

/// The requested slot went to someone else; offer what is left
pub fn slot_taken(language: Language, alternatives: &[SlotOption], today: NaiveDate) -> String {
    if alternatives.is_empty() {
        return pick(
            language,
            "माफ़ कीजिए, यह समय अब खाली नहीं है। कृपया कोई और दिन बताइए।".to_string(),
            "Sorry, that time is no longer available. Please choose another day.".to_string(),
        );
    }
    let listed = alternatives
        .iter()
        .map(|s| {
            format!(
                "{} {}",
                spoken_date(s.date, today, language),
                spoken_time(s.time, language)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    pick(
        language,
        format!("माफ़ कीजिए, यह समय अब खाली नहीं है। {listed} खाली है। कौन सा ठीक रहेगा?"),
        format!("Sorry, that time was just taken. {listed} are free. Which one suits you?"),
    )
}

pub fn cancelling(language: Language) -> String {
    pick(
        language,
        "ठीक है, मैं आपकी अपॉइंटमेंट देख रही हूँ।".to_string(),
        "Alright, let me find your appointment.".to_string(),
    )
}

pub fn cancelled(
    language: Language,
    appointment_number: &str,
    date: NaiveDate,
    today: NaiveDate,
) -> String {
    let when = spoken_date(date, today, language);
    let number = appointment_number.replace('-', " ");
    pick(
        language,
        format!("आपकी {when} की अपॉइंटमेंट, नंबर {number}, रद्द कर दी गई है। धन्यवाद।"),
        format!("Your appointment for {when}, number {number}, has been cancelled. Thank you."),
    )
}

pub fn no_cancellable_appointment(language: Language) -> String {
    pick(
        language,
        "मुझे आपके नंबर पर कोई एक आने वाली अपॉइंटमेंट नहीं मिली। हमारा रिसेप्शन आपकी मदद करेगा।"
            .to_string(),
        "I could not find a single upcoming appointment for your number. Our reception will help you."
            .to_string(),
    )
}

// ============================================================================
// Outbound reminders
// ============================================================================

pub fn reminder(
    language: Language,
    hospital_name: &str,
    doctor_name: &str,
    date: NaiveDate,
    time: NaiveTime,
    today: NaiveDate,
) -> String {
    let when = spoken_date(date, today, language);
    let at = spoken_time(time, language);
    pick(
        language,
        format!(
            "नमस्ते, यह {hospital_name} से कॉल है। {doctor_name} के साथ आपकी अपॉइंटमेंट {when} {at} है। \
             कृपया समय से पहले पहुंचें। धन्यवाद।"
        ),
        format!(
            "Hello, this is {hospital_name}. This is a reminder of your appointment with \
             {doctor_name} {when} at {at}. Please arrive a little early. Thank you."
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 8).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn relative_dates_are_spoken_naturally() {
        let monday = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let wednesday = NaiveDate::from_ymd_opt(2026, 2, 11).unwrap();
        assert_eq!(spoken_date(monday, sunday(), Language::English), "tomorrow");
        assert_eq!(spoken_date(monday, sunday(), Language::Hindi), "कल");
        assert_eq!(
            spoken_date(wednesday, sunday(), Language::English),
            "Wednesday, 11 February"
        );
        assert_eq!(
            spoken_date(wednesday, sunday(), Language::Hindi),
            "बुधवार, 11 फ़रवरी"
        );
    }

    #[test]
    fn times_carry_the_part_of_day() {
        assert_eq!(spoken_time(t(10, 0), Language::English), "10:00 AM");
        assert_eq!(spoken_time(t(15, 30), Language::English), "3:30 PM");
        assert_eq!(spoken_time(t(10, 0), Language::Hindi), "सुबह 10:00 बजे");
        assert_eq!(spoken_time(t(17, 0), Language::Hindi), "शाम 5:00 बजे");
    }

    #[test]
    fn same_day_offers_name_the_day_once() {
        let monday = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let slots = [
            SlotOption { date: monday, time: t(10, 0) },
            SlotOption { date: monday, time: t(10, 30) },
        ];
        let text = offer_slots(Language::English, "Dr. Priya Patel", &slots, sunday());
        assert_eq!(
            text,
            "Dr. Priya Patel is free tomorrow at 10:00 AM, 10:30 AM. Which time suits you?"
        );
    }

    #[test]
    fn confirmation_reads_the_number_in_groups() {
        let monday = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
        let text = booked(
            Language::English,
            "MED-20260208-0001",
            "Dr. Priya Patel",
            monday,
            t(10, 0),
            sunday(),
        );
        assert!(text.contains("MED 20260208 0001"));
        assert!(text.contains("tomorrow at 10:00 AM"));
    }
}
