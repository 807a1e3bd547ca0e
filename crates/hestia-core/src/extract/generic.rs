use super::{ExtractionStrategy, FieldRules, Heuristic, Rule};
use crate::models::FetchProfile;

/// Fallback for every other host: structured data, meta tags, then text heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericStrategy;

static RULES: FieldRules = FieldRules {
    title: &[
        Rule::JsonLd(&["name"]),
        Rule::Meta("og:title"),
        Rule::Text("h1"),
        Rule::Text("title"),
    ],
    description: &[
        Rule::JsonLd(&["description"]),
        Rule::Meta("description"),
        Rule::Meta("og:description"),
    ],
    image: &[
        Rule::Meta("og:image"),
        Rule::Meta("twitter:image"),
        Rule::JsonLd(&["image"]),
    ],
    city: &[
        Rule::JsonLd(&["address", "addressLocality"]),
        Rule::Detail(&["ville", "localisation"]),
        Rule::Heuristic(Heuristic::CityBeforePostcode),
    ],
    price: &[
        Rule::JsonLd(&["offers", "price"]),
        Rule::Meta("product:price:amount"),
        Rule::Meta("og:price:amount"),
        Rule::Attr(r#"[itemprop="price"]"#, "content"),
        Rule::Text(r#"[itemprop="price"]"#),
    ],
    surface_house: &[
        Rule::JsonLd(&["floorSize", "value"]),
        Rule::Detail(&["surface habitable", "surface"]),
        Rule::Heuristic(Heuristic::SurfaceInText),
    ],
    surface_land: &[
        Rule::Detail(&["surface terrain", "surface du terrain", "terrain"]),
        Rule::Heuristic(Heuristic::LandSurfaceInText),
    ],
    phone: &[
        Rule::Attr(r#"a[href^="tel:"]"#, "href"),
        Rule::Heuristic(Heuristic::PhoneInText),
    ],
};

impl ExtractionStrategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn fetch_profile(&self) -> FetchProfile {
        FetchProfile::EphemeralBrowser
    }

    fn settle_selectors(&self) -> &'static [&'static str] {
        &["h1", "main"]
    }

    fn rules(&self) -> &'static FieldRules {
        &RULES
    }
}
