// Utility helpers for lenient parsing and formatting.
//
// The open-data API is loose about scalar encodings (numbers arrive as
// strings or numbers, dates as plain dates or full timestamps), so all the
// "dirty" handling lives here and the rest of the code can assume clean,
// typed values.
use chrono::{Datelike, NaiveDate};
use num_format::{Locale, ToFormattedString};
use serde_json::Value;

/// Portuguese month abbreviations, indexed by month number minus one.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez",
];

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues common in exported data (thousands separators,
/// stray spaces, embedded text).
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok()
}

/// Extract an `f64` from a JSON scalar that may be a number or a string.
pub fn json_f64(v: Option<&Value>) -> Option<f64> {
    match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_f64_safe(Some(s)),
        _ => None,
    }
}

/// Extract a `u32` from a JSON scalar that may be a number or a string.
pub fn json_u32(v: Option<&Value>) -> Option<u32> {
    match v? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

/// Render a JSON scalar (string or number) as text; modality codes come
/// back as numbers from some endpoints and strings from others.
pub fn json_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a calendar date from either `YYYY-MM-DD` or a full ISO timestamp
/// (`2024-03-05T00:00:00`); anything else yields `None`.
pub fn parse_date_flex(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    let prefix = s.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// `YYYY-MM` bucket key for a date; lexicographic order of these keys is
/// chronological order.
pub fn year_month_key(d: NaiveDate) -> String {
    format!("{:04}-{:02}", d.year(), d.month())
}

pub fn month_label(month: u32) -> &'static str {
    MONTH_LABELS
        .get(month.wrapping_sub(1) as usize)
        .copied()
        .unwrap_or("?")
}

pub fn average(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Format a value as Brazilian currency (`R$ 1.234.567,89`).
pub fn format_brl(v: f64) -> String {
    let neg = v.is_sign_negative();
    let s = format!("{:.2}", v.abs());
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let formatted = int_val.to_formatted_string(&Locale::pt);
    if neg {
        format!("-R$ {},{}", formatted, frac_part)
    } else {
        format!("R$ {},{}", formatted, frac_part)
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Used for counts in console messages (e.g., `1.234 registros`).
    n.to_formatted_string(&Locale::pt)
}
