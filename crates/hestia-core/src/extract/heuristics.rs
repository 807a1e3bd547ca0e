//! Last-resort regex heuristics over the page's visible text.

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::clean_text;

/// A named body-text heuristic, usable as the tail of a rule cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    SurfaceInText,
    LandSurfaceInText,
    CityBeforePostcode,
    PhoneInText,
}

impl Heuristic {
    pub fn name(&self) -> &'static str {
        match self {
            Heuristic::SurfaceInText => "surface_in_text",
            Heuristic::LandSurfaceInText => "land_surface_in_text",
            Heuristic::CityBeforePostcode => "city_before_postcode",
            Heuristic::PhoneInText => "phone_in_text",
        }
    }

    pub fn apply(&self, text: &str) -> Option<String> {
        match self {
            Heuristic::SurfaceInText => surface_in_text(text),
            Heuristic::LandSurfaceInText => land_surface_in_text(text),
            Heuristic::CityBeforePostcode => city_before_postcode(text),
            Heuristic::PhoneInText => phone_in_text(text),
        }
    }
}

static SURFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,4}(?:[.,\s]\d{1,3})?\s?m(?:²|2\b)").expect("valid surface regex")
});

static LAND_SURFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)terrain[^.\n\r]{0,40}?(\d{1,4}(?:[.,\s]\d{1,3})?\s?m(?:²|2))")
        .expect("valid land surface regex")
});

static CITY_POSTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-zÀ-ÖØ-öø-ÿ' -]{2,40}?)\s*\(?\b\d{5}\b\)?").expect("valid city regex")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+33\s?|\b0)[1-9](?:[\s.-]?\d{2}){4}\b").expect("valid phone regex")
});

/// How far back a `terrain` mention disqualifies a living-area match.
const LAND_CONTEXT_CHARS: usize = 40;

/// Lower-case words allowed inside multi-word place names.
const PLACE_LINKERS: &[&str] = &["sur", "sous", "le", "la", "les", "de", "du", "des", "en", "lès", "lez"];

/// First `NN m²` that is not a land figure.
pub fn surface_in_text(text: &str) -> Option<String> {
    let text = clean_text(text);
    let mut floor = 0;
    for m in SURFACE_RE.find_iter(&text) {
        if !land_mention_between(&text, floor, m.start()) {
            return Some(m.as_str().trim().to_string());
        }
        floor = m.end();
    }
    None
}

/// `NN m²` shortly after the word `terrain`.
pub fn land_surface_in_text(text: &str) -> Option<String> {
    let text = clean_text(text);
    LAND_SURFACE_RE
        .captures(&text)
        .map(|caps| caps[1].trim().to_string())
}

/// The capitalised place name right before a 5-digit postal code.
pub fn city_before_postcode(text: &str) -> Option<String> {
    let text = clean_text(text);
    CITY_POSTCODE_RE
        .captures_iter(&text)
        .find_map(|caps| trailing_place_name(&caps[1]))
}

/// First French phone number (`06 12 34 56 78`, `+33 6 12 34 56 78`, dotted forms).
pub fn phone_in_text(text: &str) -> Option<String> {
    let text = clean_text(text);
    PHONE_RE.find(&text).map(|m| m.as_str().to_string())
}

/// Whether `terrain` appears shortly before `start`, not reaching back
/// past the previous figure.
fn land_mention_between(text: &str, floor: usize, start: usize) -> bool {
    let before = &text[floor..start];
    let window: String = before
        .chars()
        .rev()
        .take(LAND_CONTEXT_CHARS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    window.to_lowercase().contains("terrain")
}

/// Walk back from the end, keeping capitalised words and linkers.
fn trailing_place_name(candidate: &str) -> Option<String> {
    let mut words: Vec<&str> = Vec::new();
    for word in candidate.split_whitespace().rev() {
        let capitalised = word.chars().next().is_some_and(char::is_uppercase);
        if capitalised || PLACE_LINKERS.contains(&word) {
            words.push(word);
        } else {
            break;
        }
    }
    while words.last().is_some_and(|w| PLACE_LINKERS.contains(w)) {
        words.pop();
    }
    if words.is_empty() {
        return None;
    }
    words.reverse();
    Some(words.join(" "))
}
