use super::{ExtractionStrategy, FieldRules, Heuristic, Rule};
use crate::models::FetchProfile;

/// Leboncoin: heaviest bot protection, so a persistent stealth browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeboncoinStrategy;

static RULES: FieldRules = FieldRules {
    title: &[
        Rule::Text("h1"),
        Rule::Text(r#"[data-qa-id="adview_title"]"#),
        Rule::Text(r#"[data-testid="adview-title"]"#),
        Rule::JsonLd(&["name"]),
        Rule::Meta("og:title"),
    ],
    description: &[
        Rule::Text(r#"[data-qa-id="adview_description_container"]"#),
        Rule::Text(r#"[data-qa-id="adview_description"]"#),
        Rule::Meta("description"),
        Rule::Meta("og:description"),
        Rule::JsonLd(&["description"]),
    ],
    image: &[
        Rule::Meta("og:image"),
        Rule::Attr(r#"[data-qa-id="adview_photos"] img"#, "src"),
        Rule::JsonLd(&["image"]),
    ],
    city: &[
        Rule::JsonLd(&["address", "addressLocality"]),
        Rule::Text(r#"[data-qa-id="adview_location"] a"#),
        Rule::Text(r#"[data-qa-id="adview_location"]"#),
        Rule::Text(r#"[data-testid="adview-location"]"#),
        Rule::Text(".Property__city"),
        Rule::Heuristic(Heuristic::CityBeforePostcode),
    ],
    price: &[
        Rule::Text(r#"[data-qa-id="adview_price"]"#),
        Rule::Text(r#"[data-testid="adview-price"]"#),
        Rule::JsonLd(&["offers", "price"]),
        Rule::Meta("og:price:amount"),
        Rule::Text(".Price__value"),
    ],
    surface_house: &[
        Rule::JsonLd(&["floorSize", "value"]),
        Rule::Detail(&["surface habitable", "surface"]),
        Rule::Text(r#"[data-qa-id="criteria_item_square"] p:last-child"#),
        Rule::Text(".Property__surface"),
        Rule::Heuristic(Heuristic::SurfaceInText),
    ],
    surface_land: &[
        Rule::Detail(&["surface totale du terrain", "surface du terrain", "surface terrain", "terrain"]),
        Rule::Text(r#"[data-qa-id="criteria_item_land_plot_surface"] p:last-child"#),
        Rule::Heuristic(Heuristic::LandSurfaceInText),
    ],
    phone: &[
        Rule::Attr(r#"a[href^="tel:"]"#, "href"),
        Rule::Text(r#"[data-qa-id="adview_contact_phone"]"#),
        Rule::Heuristic(Heuristic::PhoneInText),
    ],
};

impl ExtractionStrategy for LeboncoinStrategy {
    fn name(&self) -> &'static str {
        "leboncoin"
    }

    fn fetch_profile(&self) -> FetchProfile {
        FetchProfile::PersistentBrowser
    }

    fn settle_selectors(&self) -> &'static [&'static str] {
        &[
            "h1",
            r#"[data-qa-id="adview_title"]"#,
            r#"[data-qa-id="adview_price"]"#,
        ]
    }

    fn rules(&self) -> &'static FieldRules {
        &RULES
    }
}
