//! Field extraction: ordered typed rules per field, first match wins.
//!
//! Each strategy declares a [`FieldRules`] table. Every field walks its
//! rules in order (JSON-LD, CSS, detail keys, meta tags, then named
//! body-text heuristics) and keeps the first candidate that survives
//! normalization. Fields nothing matched stay empty.

pub mod bienici;
pub mod generic;
pub mod heuristics;
pub mod leboncoin;
pub mod normalize;

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use crate::models::{FetchProfile, ListingRecord};

pub use bienici::BienIciStrategy;
pub use generic::GenericStrategy;
pub use heuristics::Heuristic;
pub use leboncoin::LeboncoinStrategy;

/// One way to find a field's raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Path into the page's primary JSON-LD object. Arrays yield their first element.
    JsonLd(&'static [&'static str]),
    /// Text of the first element matching a CSS selector.
    Text(&'static str),
    /// Attribute of the first element matching a CSS selector.
    Attr(&'static str, &'static str),
    /// First present key of the page's definition-list detail map.
    Detail(&'static [&'static str]),
    /// `content` of `<meta property=…>` or `<meta name=…>`.
    Meta(&'static str),
    Heuristic(Heuristic),
}

/// Rule cascade for every record field.
#[derive(Debug)]
pub struct FieldRules {
    pub title: &'static [Rule],
    pub description: &'static [Rule],
    pub image: &'static [Rule],
    pub city: &'static [Rule],
    pub price: &'static [Rule],
    pub surface_house: &'static [Rule],
    pub surface_land: &'static [Rule],
    pub phone: &'static [Rule],
}

impl FieldRules {
    fn all(&self) -> impl Iterator<Item = &'static Rule> {
        [
            self.title,
            self.description,
            self.image,
            self.city,
            self.price,
            self.surface_house,
            self.surface_land,
            self.phone,
        ]
        .into_iter()
        .flatten()
    }
}

/// Site-specific ruleset plus how its pages must be fetched.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn fetch_profile(&self) -> FetchProfile;

    /// Selectors whose appearance means the listing has rendered.
    fn settle_selectors(&self) -> &'static [&'static str];

    fn rules(&self) -> &'static FieldRules;

    /// Build a record from fetched markup. Assumes the page was not blocked.
    fn extract(&self, html: &str, url: &Url) -> ListingRecord {
        let page = Page::parse(html, url);
        page.record(self.rules())
    }
}

static JSON_LD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid JSON-LD selector")
});

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

static DT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dt").expect("valid dt selector"));

static DETAIL_BLOCKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div.detailItem, div.characteristic, [data-qa-id^="criteria_item_"]"#)
        .expect("valid detail block selector")
});

static DETAIL_PARTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span, p").expect("valid detail part selector"));

/// A parsed document with the lookups rules need.
pub struct Page {
    document: Html,
    url: Url,
    json_ld: Option<Value>,
    details: HashMap<String, String>,
    body_text: String,
}

impl Page {
    pub fn parse(html: &str, url: &Url) -> Self {
        let document = Html::parse_document(html);
        let json_ld = primary_json_ld(&document);
        let details = detail_map(&document);
        let body_text = document
            .select(&BODY)
            .next()
            .map(|body| body.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        Self {
            document,
            url: url.clone(),
            json_ld,
            details,
            body_text: normalize::clean_text(&body_text),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Raw candidate for one rule, whitespace-normalized. Empty is no match.
    pub fn apply(&self, rule: &Rule) -> Option<String> {
        let raw = match rule {
            Rule::JsonLd(path) => self.json_ld.as_ref().and_then(|v| json_path(v, path)),
            Rule::Text(css) => self
                .select_first(css)
                .map(|el| el.text().collect::<Vec<_>>().join(" ")),
            Rule::Attr(css, attr) => self
                .select_first(css)
                .and_then(|el| el.value().attr(attr).map(str::to_string)),
            Rule::Detail(keys) => keys.iter().find_map(|k| self.details.get(*k).cloned()),
            Rule::Meta(name) => self.meta(name),
            Rule::Heuristic(h) => {
                let hit = h.apply(&self.body_text);
                if hit.is_some() {
                    tracing::debug!(heuristic = h.name(), url = %self.url, "Body-text heuristic matched");
                }
                hit
            }
        }?;
        let cleaned = normalize::clean_text(&raw);
        (!cleaned.is_empty()).then_some(cleaned)
    }

    fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let selector = match Selector::parse(css) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::debug!(%css, error = ?e, "Skipping unparsable selector");
                return None;
            }
        };
        self.document.select(&selector).next()
    }

    fn meta(&self, name: &str) -> Option<String> {
        let css = format!(r#"meta[property="{name}"], meta[name="{name}"]"#);
        self.select_first(&css)
            .and_then(|el| el.value().attr("content").map(str::to_string))
    }

    /// Assemble a full record from a rule table.
    pub fn record(&self, rules: &FieldRules) -> ListingRecord {
        let (price, price_value) = first_match(self, rules.price)
            .map(|raw| normalize::normalize_price(&raw))
            .unwrap_or_default();
        let surface_house =
            first_match_with(self, rules.surface_house, normalize::normalize_surface)
                .unwrap_or_default();
        let surface_land = first_match_with(self, rules.surface_land, normalize::normalize_surface)
            .unwrap_or_default();
        let price_per_m2 =
            normalize::price_per_m2(price_value, normalize::parse_surface(&surface_house));

        ListingRecord {
            title: first_match(self, rules.title).unwrap_or_default(),
            description: first_match(self, rules.description)
                .map(|raw| normalize::normalize_description(&raw))
                .unwrap_or_default(),
            image: first_match_with(self, rules.image, |raw| {
                let resolved = normalize::resolve_image(&self.url, raw);
                (!resolved.is_empty()).then_some(resolved)
            })
            .unwrap_or_default(),
            city: first_match_with(self, rules.city, |raw| {
                let city = normalize::normalize_city(raw);
                (!city.is_empty()).then_some(city)
            })
            .unwrap_or_default(),
            price,
            price_value,
            price_per_m2,
            surface_house,
            surface_land,
            phone: first_match_with(self, rules.phone, heuristics::phone_in_text)
                .unwrap_or_default(),
            blocked: false,
            blocked_reason: None,
        }
    }
}

/// First non-empty candidate over `rules`, in order.
pub fn first_match(page: &Page, rules: &[Rule]) -> Option<String> {
    rules.iter().find_map(|rule| page.apply(rule))
}

/// First candidate over `rules` that `accept` turns into a value.
pub fn first_match_with(
    page: &Page,
    rules: &[Rule],
    accept: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    rules
        .iter()
        .filter_map(|rule| page.apply(rule))
        .find_map(|candidate| accept(&candidate))
}

/// First JSON-LD object that describes the listing (has a name,
/// description or offers), looking through arrays and `@graph`.
fn primary_json_ld(document: &Html) -> Option<Value> {
    document
        .select(&JSON_LD)
        .filter_map(|el| serde_json::from_str::<Value>(&el.text().collect::<String>()).ok())
        .flat_map(|value| match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("@graph") {
                Some(Value::Array(graph)) => graph,
                Some(other) => {
                    map.insert("@graph".to_string(), other);
                    vec![Value::Object(map)]
                }
                None => vec![Value::Object(map)],
            },
            other => vec![other],
        })
        .find(|value| {
            ["name", "description", "offers"]
                .iter()
                .any(|key| value.get(*key).is_some())
        })
}

fn json_path(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = first_element(current).get(*key)?;
    }
    match first_element(current) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_element(value: &Value) -> &Value {
    match value {
        Value::Array(items) => items.first().unwrap_or(value),
        _ => value,
    }
}

/// Key/value pairs from `<dt>/<dd>` lists and characteristic blocks,
/// keys lower-cased without trailing colons.
fn detail_map(document: &Html) -> HashMap<String, String> {
    let mut details = HashMap::new();
    let mut insert = |key: String, value: String| {
        let key = normalize::clean_text(&key).to_lowercase().replace(':', "");
        let key = key.trim().to_string();
        let value = normalize::clean_text(&value);
        if !key.is_empty() && !value.is_empty() {
            details.entry(key).or_insert(value);
        }
    };

    for dt in document.select(&DT) {
        let dd = dt
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .filter(|el| el.value().name() == "dd");
        if let Some(dd) = dd {
            insert(dt.text().collect(), dd.text().collect());
        }
    }

    for block in document.select(&DETAIL_BLOCKS) {
        let parts: Vec<ElementRef<'_>> = block.select(&DETAIL_PARTS).collect();
        if parts.len() >= 2 {
            insert(
                parts[0].text().collect(),
                parts[parts.len() - 1].text().collect(),
            );
        }
    }

    details
}

/// Every selector a rule table uses, for validation.
pub fn selectors_of(rules: &FieldRules) -> Vec<&'static str> {
    rules
        .all()
        .filter_map(|rule| match rule {
            Rule::Text(css) | Rule::Attr(css, _) => Some(*css),
            _ => None,
        })
        .collect()
}
