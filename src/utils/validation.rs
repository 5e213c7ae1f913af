//! Input validation and normalization utilities

use once_cell::sync::Lazy;
use regex::Regex;

/// Pragmatic email shape check; full RFC 5322 parsing is not attempted
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap()
});

/// Two-letter country code
static COUNTRY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());

pub const MAX_EMAIL_LEN: usize = 160;

/// Trim and lower-case an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate an already normalized email address
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= MAX_EMAIL_LEN && EMAIL_REGEX.is_match(email)
}

/// Trim and upper-case a country code
pub fn normalize_country(country: &str) -> String {
    country.trim().to_uppercase()
}

pub fn validate_country(country: &str) -> bool {
    COUNTRY_REGEX.is_match(country)
}

/// Trim an optional field, mapping blank values to `None`
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a validity period in days; anything but an integer in `1..=max` yields `default`
pub fn parse_days_valid(raw: Option<&str>, default: i64, max: i64) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|days| (1..=max).contains(days))
        .unwrap_or(default)
}
