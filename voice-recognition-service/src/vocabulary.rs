//! Phrase hints that bias recognition towards booking conversations.
//!
//! Callers code-switch between Hindi and English, so the hint list always
//! carries both languages regardless of the language selected on the keypad.

use schedule_store::{Language, Specialty};

/// Boost applied to every hint phrase by providers that support weighting
pub const PHRASE_BOOST: f32 = 15.0;

const BOOKING_TERMS_EN: &[&str] = &[
    "appointment",
    "doctor",
    "book",
    "cancel",
    "reschedule",
    "tomorrow",
    "today",
    "day after tomorrow",
    "morning",
    "afternoon",
    "evening",
    "yes",
    "no",
];

const BOOKING_TERMS_HI: &[&str] = &[
    "अपॉइंटमेंट",
    "डॉक्टर",
    "बुकिंग",
    "कैंसल",
    "कल",
    "आज",
    "परसों",
    "सुबह",
    "दोपहर",
    "शाम",
    "हाँ",
    "नहीं",
];

/// Romanised Hindi as it commonly comes back from phone-model recognisers
const BOOKING_TERMS_HINGLISH: &[&str] = &["kal", "aaj", "parso", "subah", "shaam", "haan", "nahi"];

const DEPARTMENT_ALIASES: &[&str] = &["ENT", "pediatric", "orthopedic", "general medicine", "heart"];

pub struct BookingVocabulary;

impl BookingVocabulary {
    /// Hint phrases for a turn, primary language first, deduplicated
    pub fn phrases(primary: Language) -> Vec<String> {
        let (first, second) = match primary {
            Language::Hindi => (BOOKING_TERMS_HI, BOOKING_TERMS_EN),
            Language::English => (BOOKING_TERMS_EN, BOOKING_TERMS_HI),
        };

        let departments = Specialty::ALL.into_iter().flat_map(|s| {
            [
                s.display_name(Language::English),
                s.display_name(Language::Hindi),
            ]
        });

        let mut phrases: Vec<String> = Vec::new();
        for phrase in first
            .iter()
            .chain(second)
            .chain(BOOKING_TERMS_HINGLISH)
            .copied()
            .chain(departments)
            .chain(DEPARTMENT_ALIASES.iter().copied())
        {
            if !phrases.iter().any(|p| p.eq_ignore_ascii_case(phrase)) {
                phrases.push(phrase.to_string());
            }
        }
        phrases
    }

    /// Hints rendered as a free-text prompt for providers without phrase lists
    pub fn prompt(primary: Language) -> String {
        let lead = match primary {
            Language::Hindi => "अस्पताल में अपॉइंटमेंट बुकिंग की बातचीत।",
            Language::English => "A phone call booking a hospital appointment.",
        };
        format!("{lead} {}", Self::phrases(primary).join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_cover_both_languages_and_departments() {
        let phrases = BookingVocabulary::phrases(Language::English);

        assert_eq!(phrases.first().map(String::as_str), Some("appointment"));
        for expected in ["कल", "parso", "Cardiology", "हृदय रोग", "ENT"] {
            assert!(phrases.iter().any(|p| p == expected), "missing {expected}");
        }
    }

    #[test]
    fn hindi_primary_leads_with_hindi_terms() {
        let phrases = BookingVocabulary::phrases(Language::Hindi);
        assert_eq!(phrases.first().map(String::as_str), Some("अपॉइंटमेंट"));
    }

    #[test]
    fn duplicates_are_dropped_case_insensitively() {
        let phrases = BookingVocabulary::phrases(Language::English);
        let ent = phrases.iter().filter(|p| p.eq_ignore_ascii_case("ent")).count();
        assert_eq!(ent, 1);
    }
}
