//! Value normalizers shared by every strategy.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::util::truncate_chars;

/// Longest description the record sync accepts.
pub const DESCRIPTION_MAX_CHARS: usize = 1990;

static PRICE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:[ .\u{a0}\u{202f}]\d{3})+|\d+").expect("valid price regex")
});

static SURFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:[ \u{a0}\u{202f}]\d{3})+(?:[.,]\d+)?|\d+(?:[.,]\d+)?")
        .expect("valid surface regex")
});

static POSTCODE_LEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}\s+(.+)$").expect("valid postcode regex"));

static POSTCODE_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\(\d{5}\)").expect("valid postcode regex"));

static POSTCODE_TRAILING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+\d{5}\b").expect("valid postcode regex"));

/// Collapse whitespace runs (non-breaking and narrow no-break spaces
/// included) into one space and trim.
pub fn clean_text(raw: &str) -> String {
    raw.replace(['\u{a0}', '\u{202f}'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Integer value of the first numeric run, thousands separators dropped.
pub fn parse_price(raw: &str) -> Option<u64> {
    let run = PRICE_RUN_RE.find(raw)?;
    let digits: String = run.as_str().chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// `1234567` → `"1 234 567"`.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Display form and numeric value of a raw price text.
///
/// Without digits the cleaned text is kept as is and the value is `None`.
pub fn normalize_price(raw: &str) -> (String, Option<u64>) {
    let cleaned = clean_text(raw);
    match parse_price(&cleaned) {
        Some(value) => (format!("{} €", format_thousands(value)), Some(value)),
        None => (cleaned, None),
    }
}

/// First number in a surface text; `,` and `.` both read as decimal points.
pub fn parse_surface(raw: &str) -> Option<f64> {
    let run = SURFACE_RE.find(raw)?;
    let normalized: String = run
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    normalized.parse().ok()
}

/// Surface text as displayed: cleaned, with a unit when the source had none.
/// Returns `None` when the text carries no number.
pub fn normalize_surface(raw: &str) -> Option<String> {
    let cleaned = clean_text(raw);
    parse_surface(&cleaned)?;
    let lower = cleaned.to_lowercase();
    if lower.contains("m²") || lower.contains("m2") {
        Some(cleaned)
    } else {
        Some(format!("{cleaned} m²"))
    }
}

/// Rounded price per square metre, e.g. `"3 000 €/m²"`.
///
/// Empty unless both the price and the surface are positive.
pub fn price_per_m2(price: Option<u64>, surface: Option<f64>) -> String {
    match (price, surface) {
        (Some(p), Some(s)) if p > 0 && s > 0.0 => {
            let per_m2 = (p as f64 / s).round() as u64;
            format!("{} €/m²", format_thousands(per_m2))
        }
        _ => String::new(),
    }
}

/// City name out of a location block (`"75011 Paris"`, `"Paris (75011)"`,
/// `"Paris 75011"`, `"Paris, Île-de-France"`, `"Lyon - Rhône"`).
pub fn normalize_city(raw: &str) -> String {
    let cleaned = clean_text(raw);

    let anchored = if let Some(caps) = POSTCODE_LEADING_RE.captures(&cleaned) {
        caps[1].to_string()
    } else if let Some(caps) = POSTCODE_PAREN_RE.captures(&cleaned) {
        caps[1].to_string()
    } else if let Some(caps) = POSTCODE_TRAILING_RE.captures(&cleaned) {
        caps[1].to_string()
    } else {
        cleaned
    };

    let before_comma = anchored.split(',').next().unwrap_or_default();
    let before_dash = before_comma.split(" - ").next().unwrap_or_default();
    before_dash.trim().to_string()
}

/// Absolute `http(s)` image URL resolved against the page, or empty.
pub fn resolve_image(base: &Url, raw: &str) -> String {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        return String::new();
    }
    match base.join(&cleaned) {
        Ok(resolved) if matches!(resolved.scheme(), "http" | "https") => resolved.to_string(),
        _ => String::new(),
    }
}

pub fn normalize_description(raw: &str) -> String {
    truncate_chars(&clean_text(raw), DESCRIPTION_MAX_CHARS)
}
