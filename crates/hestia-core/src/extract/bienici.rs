use super::{ExtractionStrategy, FieldRules, Heuristic, Rule};
use crate::models::FetchProfile;

/// Bien'ici serves full markup to plain HTTP clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct BienIciStrategy;

static RULES: FieldRules = FieldRules {
    title: &[
        Rule::Text("h1"),
        Rule::Meta("og:title"),
        Rule::JsonLd(&["name"]),
    ],
    description: &[
        Rule::Text("#description pre"),
        Rule::Text("div.description"),
        Rule::Text("section.description"),
        Rule::Meta("description"),
        Rule::Meta("og:description"),
    ],
    image: &[
        Rule::Meta("og:image"),
        Rule::Attr(r#"img[data-testid="picture-image"]"#, "src"),
        Rule::Attr("img.mainPhoto", "src"),
    ],
    city: &[
        Rule::JsonLd(&["address", "addressLocality"]),
        Rule::Text("span.location"),
        Rule::Text("div.location"),
        Rule::Text("h2"),
        Rule::Heuristic(Heuristic::CityBeforePostcode),
    ],
    price: &[
        Rule::Text("span.price"),
        Rule::Text("div.price"),
        Rule::Meta("product:price:amount"),
        Rule::JsonLd(&["offers", "price"]),
    ],
    surface_house: &[
        Rule::JsonLd(&["floorSize", "value"]),
        Rule::Detail(&["surface", "surface habitable", "surf. habitable"]),
        Rule::Heuristic(Heuristic::SurfaceInText),
    ],
    surface_land: &[
        Rule::Detail(&["surface terrain", "terrain", "parcelle"]),
        Rule::Heuristic(Heuristic::LandSurfaceInText),
    ],
    phone: &[
        Rule::Text("a.phoneNumber"),
        Rule::Text(r#"button[data-testid="phone-button"]"#),
        Rule::Text("span.phone"),
        Rule::Attr(r#"a[href^="tel:"]"#, "href"),
        Rule::Heuristic(Heuristic::PhoneInText),
    ],
};

impl ExtractionStrategy for BienIciStrategy {
    fn name(&self) -> &'static str {
        "bienici"
    }

    fn fetch_profile(&self) -> FetchProfile {
        FetchProfile::Http
    }

    fn settle_selectors(&self) -> &'static [&'static str] {
        &["h1"]
    }

    fn rules(&self) -> &'static FieldRules {
        &RULES
    }
}
