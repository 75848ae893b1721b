//! Value formatting and detection helpers used by column inference

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Number, Value};
use std::sync::OnceLock;

/// Date-like prefixes: `YYYY-MM-DD`, `M/D/YYYY`, `M-D-YYYY`, `YYYY/M/D`
const DATE_PREFIX_PATTERN: &str =
    r"^(?:\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4}|\d{1,2}-\d{1,2}-\d{4}|\d{4}/\d{1,2}/\d{1,2})";

const URL_PATTERN: &str = r"^https?://(www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_\+.~#?&/=]*)$";

/// Strings shorter than this are never treated as free-form dates
const MIN_FREEFORM_DATE_LEN: usize = 6;

/// Fraction digits kept when displaying non-integral numbers
const MAX_FRACTION_DIGITS: usize = 3;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

fn date_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DATE_PREFIX_PATTERN).expect("date prefix pattern is valid"))
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URL_PATTERN).expect("url pattern is valid"))
}

/// Whether a value is an HTTP(S) URL we are willing to render as a link
pub fn is_valid_url(value: &Value) -> bool {
    value.as_str().is_some_and(|s| url_regex().is_match(s))
}

/// Whether a string looks like a date
pub fn looks_like_date(s: &str) -> bool {
    date_prefix_regex().is_match(s)
        || (s.chars().count() >= MIN_FREEFORM_DATE_LEN && parse_date_str(s).is_some())
}

/// Parse a date or date-time string. Values without an offset are read as UTC.
pub fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    NAIVE_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a JSON value as a date: strings by format, numbers as epoch milliseconds
pub fn parse_date_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Display a date cell as `M/D/YYYY`, or the raw value when it is not a date
pub fn format_date(value: &Value) -> String {
    if value.is_null() {
        return String::new();
    }
    match parse_date_value(value) {
        Some(date) => date.format("%-m/%-d/%Y").to_string(),
        None => crate::row::display_text(value),
    }
}

/// Convert an edited date cell into an RFC 3339 timestamp when possible
pub fn parse_date_edit(value: Value) -> Value {
    match parse_date_value(&value) {
        Some(date) => Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => value,
    }
}

/// Display a number with thousands separators (`1234567.5` → `1,234,567.5`)
pub fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return sign_and_group(i < 0, &i.unsigned_abs().to_string(), "");
    }
    if let Some(u) = n.as_u64() {
        return group_thousands(&u.to_string());
    }

    let f = n.as_f64().unwrap_or_default();
    let fixed = format!("{:.*}", MAX_FRACTION_DIGITS, f.abs());
    let (int_part, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');
    let is_zero = int_part.chars().all(|c| c == '0') && fraction.is_empty();

    sign_and_group(f < 0.0 && !is_zero, int_part, fraction)
}

fn sign_and_group(negative: bool, int_digits: &str, fraction: &str) -> String {
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_digits));
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
