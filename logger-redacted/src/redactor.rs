// Pattern literals are compiled once and are known-valid.
#![allow(clippy::unwrap_used)]

use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    // Indian mobiles (optionally +91 / 91 / 0 prefixed, optionally split 5+5)
    // and STD landlines such as 011-40036376.
    static ref PHONE_REGEX: Regex = Regex::new(
        r"(?:\+91[-\s]?|\b)(?:(?:91)?0?[6-9]\d{4}[-\s]?\d{5}|0\d{2,4}[-\s]?\d{6,8})\b"
    )
    .unwrap();
    static ref DIGIT_REGEX: Regex = Regex::new(r"\d").unwrap();
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// PII redactor for log lines
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", correlation_hash(email))
                } else {
                    let (local, domain) = email.split_once('@').unwrap_or((email, ""));
                    format!(
                        "{}***@{}***",
                        local.chars().next().unwrap_or('*'),
                        domain.chars().next().unwrap_or('*')
                    )
                }
            })
            .to_string()
    }

    fn redact_phones(&self, text: &str) -> String {
        PHONE_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let number = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("PHONE[{}]", correlation_hash(&digits_only(number)))
                } else {
                    mask_phone(number)
                }
            })
            .to_string()
    }
}

/// Short, stable correlation token for a redacted value.
///
/// The same caller number always yields the same token, so a support engineer
/// can follow one caller across log lines without seeing the number.
pub fn correlation_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    general_purpose::URL_SAFE_NO_PAD.encode(digest.get(..8).unwrap_or_default())
}

/// Mask every digit except the last four: `+919876543210` -> `+91******3210`.
pub fn mask_phone(number: &str) -> String {
    let total = number.chars().filter(char::is_ascii_digit).count();
    let keep_from = total.saturating_sub(4);
    let mut seen = 0;
    number
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen <= keep_from && !(seen <= 2 && number.starts_with('+')) {
                    return '*';
                }
            }
            c
        })
        .collect()
}

/// Convenience for structured fields: `caller = %redact_phone(from)`.
pub fn redact_phone(number: &str) -> String {
    let digits = digits_only(number);
    if digits.is_empty() {
        return String::new();
    }
    format!("PHONE[{}]", correlation_hash(&digits))
}

fn digits_only(value: &str) -> String {
    DIGIT_REGEX
        .find_iter(value)
        .map(|m| m.as_str())
        .collect()
}
