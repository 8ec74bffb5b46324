//! Locale-tolerant number and date parsing shared by the field cascades.
//!
//! Source pages format numbers the Spanish way (`1.234,50`): `.` groups
//! thousands and `,` marks the decimal. Coordinates embedded in scripts may
//! instead use plain `40.4168`. Both shapes are handled here so the cascades
//! never have to care.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());
static DMY_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap());

/// Parse a Spanish-formatted number: `.` is a thousands separator, `,` the
/// decimal separator. `"1.234,50"` -> `1234.5`, `"950"` -> `950.0`.
pub fn parse_decimal_comma(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a number that may be either Spanish-formatted or a plain decimal.
/// With a comma present the Spanish reading applies; otherwise the dot is
/// taken as the decimal point (`"40.4168"` -> `40.4168`).
pub fn parse_tolerant_f64(raw: &str) -> Option<f64> {
    if raw.contains(',') {
        parse_decimal_comma(raw)
    } else {
        raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
    }
}

/// Normalize a date-bearing text to `YYYY-MM-DD` when it contains an ISO or
/// `dd/mm/yyyy` date; anything else comes back as trimmed raw text.
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(caps) = ISO_DATE_RE.captures(trimmed) {
        if let Some(date) = ymd(&caps[1], &caps[2], &caps[3]) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    if let Some(caps) = DMY_DATE_RE.captures(trimmed) {
        if let Some(date) = ymd(&caps[3], &caps[2], &caps[1]) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    trimmed.to_string()
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )
}

/// `os_mallos_a_falperra` -> `Os Mallos A Falperra`.
pub fn title_case_slug(slug: &str) -> String {
    slug.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
