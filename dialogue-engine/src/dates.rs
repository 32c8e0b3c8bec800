//! Date and time expressions as callers say them, in English, Hindi and
//! Hinglish. Relative words resolve against the clinic's current date.

// Pattern literals are compiled once and are known-valid.
#![allow(clippy::unwrap_used)]

use chrono::{Datelike, Days, NaiveDate, NaiveTime, Weekday};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ISO_DATE: Regex = Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap();
    static ref DAY_MONTH: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b"
    )
    .unwrap();
    static ref CLOCK_TIME: Regex =
        Regex::new(r"(?i)\b(\d{1,2})[:.](\d{2})\s*(a\.?m\.?|p\.?m\.?)?").unwrap();
    static ref HOUR_TIME: Regex =
        Regex::new(r"(?i)\b(\d{1,2})\s*(a\.?m\.?|p\.?m\.?|baje|o'?clock|बजे)").unwrap();
}

/// Lower-cased words, splitting on whitespace, ASCII punctuation and the danda
pub(crate) fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == '।' || (c.is_ascii_punctuation() && c != '\''))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

pub(crate) fn has_any(tokens: &[String], words: &[&str]) -> bool {
    tokens.iter().any(|t| words.contains(&t.as_str()))
}

fn has_phrase(text: &str, phrases: &[&str]) -> bool {
    let lower = text.to_lowercase();
    phrases.iter().any(|p| lower.contains(p))
}

const DAY_AFTER: &[&str] = &["parso", "parson", "parsoon", "परसों", "परसो"];
const TODAY: &[&str] = &["today", "aaj", "aj", "आज", "abhi"];
const TOMORROW: &[&str] = &["tomorrow", "kal", "kall", "कल"];

const WEEKDAY_NAMES: &[(Weekday, &[&str])] = &[
    (Weekday::Mon, &["monday", "mon", "somvar", "somwar", "सोमवार"]),
    (Weekday::Tue, &["tuesday", "tue", "mangalvar", "mangalwar", "मंगलवार"]),
    (Weekday::Wed, &["wednesday", "wed", "budhvar", "budhwar", "बुधवार"]),
    (
        Weekday::Thu,
        &["thursday", "thu", "guruvar", "guruwar", "brihaspativar", "गुरुवार"],
    ),
    (Weekday::Fri, &["friday", "fri", "shukravar", "shukrawar", "शुक्रवार"]),
    (Weekday::Sat, &["saturday", "sat", "shanivar", "shaniwar", "शनिवार"]),
    (
        Weekday::Sun,
        &["sunday", "sun", "ravivar", "raviwar", "itwar", "रविवार"],
    ),
];

/// Next date after `today` falling on `weekday`, never `today` itself
pub fn next_weekday(today: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    let ahead = (7 + weekday.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today.checked_add_days(Days::new(u64::from(ahead)))
}

fn month_number(abbrev: &str) -> Option<u32> {
    let months = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = abbrev.to_ascii_lowercase();
    months
        .iter()
        .position(|m| lower.starts_with(m))
        .and_then(|i| u32::try_from(i + 1).ok())
}

/// Resolve a spoken or written date against `today`.
///
/// Handles `aaj/kal/parso`, `today/tomorrow/day after tomorrow`, the
/// Devanagari forms, weekday names, `9 feb` and ISO `2026-02-09`.
pub fn resolve_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE.captures(text) {
        let year = caps.get(1)?.as_str().parse().ok()?;
        let month = caps.get(2)?.as_str().parse().ok()?;
        let day = caps.get(3)?.as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DAY_MONTH.captures(text) {
        let day = caps.get(1)?.as_str().parse().ok()?;
        let month = month_number(caps.get(2)?.as_str())?;
        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
        return if this_year < today {
            NaiveDate::from_ymd_opt(today.year() + 1, month, day)
        } else {
            Some(this_year)
        };
    }

    let words = tokens(text);
    if has_phrase(text, &["day after tomorrow"]) || has_any(&words, DAY_AFTER) {
        return today.checked_add_days(Days::new(2));
    }
    if has_any(&words, TOMORROW) {
        return today.checked_add_days(Days::new(1));
    }
    if has_any(&words, TODAY) {
        return Some(today);
    }

    WEEKDAY_NAMES
        .iter()
        .find(|(_, names)| has_any(&words, names))
        .and_then(|(weekday, _)| next_weekday(today, *weekday))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

fn day_part(words: &[String]) -> Option<DayPart> {
    if has_any(words, &["subah", "subha", "morning", "सुबह"]) {
        Some(DayPart::Morning)
    } else if has_any(words, &["dopahar", "dopehar", "afternoon", "दोपहर"]) {
        Some(DayPart::Afternoon)
    } else if has_any(words, &["shaam", "sham", "evening", "शाम"]) {
        Some(DayPart::Evening)
    } else {
        None
    }
}

fn hour_word(word: &str) -> Option<u32> {
    let hour = match word {
        "ek" | "one" | "एक" => 1,
        "do" | "two" | "दो" => 2,
        "teen" | "three" | "तीन" => 3,
        "char" | "chaar" | "four" | "चार" => 4,
        "paanch" | "panch" | "five" | "पांच" | "पाँच" => 5,
        "chhe" | "che" | "six" | "छह" | "छः" => 6,
        "saat" | "seven" | "सात" => 7,
        "aath" | "eight" | "आठ" => 8,
        "nau" | "nine" | "नौ" => 9,
        "das" | "dus" | "ten" | "दस" => 10,
        "gyarah" | "gyara" | "eleven" | "ग्यारह" => 11,
        "barah" | "bara" | "twelve" | "बारह" => 12,
        other => return other.parse().ok().filter(|h| (1..=23).contains(h)),
    };
    Some(hour)
}

/// Twelve-hour reading with clinic-hours defaults: a bare 1 to 7 is afternoon
fn to_24h(hour: u32, meridiem: Option<&str>, part: Option<DayPart>) -> Option<u32> {
    if hour > 23 {
        return None;
    }
    if hour >= 13 {
        return Some(hour);
    }
    let pm = match meridiem.map(|m| m.to_ascii_lowercase().replace('.', "")) {
        Some(m) if m == "pm" => true,
        Some(m) if m == "am" => false,
        _ => match part {
            Some(DayPart::Morning) => false,
            Some(DayPart::Afternoon | DayPart::Evening) => true,
            None => (1..=7).contains(&hour),
        },
    };
    Some(match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    })
}

/// Parse a clock time: `10:30`, `2 pm`, `10 baje`, `shaam 5 baje`,
/// `saade das baje`, `14:00`.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let words = tokens(text);
    let part = day_part(&words);

    if let Some(caps) = CLOCK_TIME.captures(text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        let hour = to_24h(hour, caps.get(3).map(|m| m.as_str()), part)?;
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    if let Some(caps) = HOUR_TIME.captures(text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let marker = caps.get(2)?.as_str();
        let meridiem = marker
            .to_ascii_lowercase()
            .starts_with(['a', 'p'])
            .then_some(marker);
        let hour = to_24h(hour, meridiem, part)?;
        return NaiveTime::from_hms_opt(hour, 0, 0);
    }

    // Spelled-out hour before "baje"
    let at = words.iter().position(|w| w == "baje" || w == "बजे")?;
    let hour_at = at.checked_sub(1)?;
    let hour = hour_word(words.get(hour_at)?)?;
    let half = hour_at
        .checked_sub(1)
        .and_then(|i| words.get(i))
        .is_some_and(|w| matches!(w.as_str(), "saade" | "sade" | "sadhe" | "साढ़े"));
    let hour = to_24h(hour, None, part)?;
    NaiveTime::from_hms_opt(hour, if half { 30 } else { 0 }, 0)
}
