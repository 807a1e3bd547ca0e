//! The fixed table of supported listing hosts.
//!
//! URL recovery uses it to find host tokens and path keywords inside
//! flattened identifiers; host dispatch uses it to pick a strategy.

/// Which extraction ruleset serves a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Leboncoin,
    BienIci,
    Generic,
}

/// A supported listing host.
#[derive(Debug)]
pub struct SupportedHost {
    /// Registrable host name without `www.` (e.g. `leboncoin.fr`).
    pub domain: &'static str,
    /// Whether the canonical form carries a `www.` prefix.
    pub www: bool,
    /// Path keywords in their canonical spelling. Keywords split flattened
    /// paths into segments; everything else is treated as opaque slug.
    pub path_keywords: &'static [&'static str],
    pub strategy: StrategyKind,
}

impl SupportedHost {
    /// Canonical host name, with `www.` when the host uses it.
    pub fn canonical_host(&self) -> String {
        if self.www {
            format!("www.{}", self.domain)
        } else {
            self.domain.to_string()
        }
    }

    /// The host as it appears inside a dash-flattened identifier.
    pub fn flattened_token(&self) -> String {
        self.domain.replace('.', "-")
    }
}

pub static SUPPORTED_HOSTS: &[SupportedHost] = &[
    SupportedHost {
        domain: "leboncoin.fr",
        www: true,
        path_keywords: &[
            "ad",
            "vi",
            "ventes_immobilieres",
            "locations",
            "colocations",
            "locations_saisonnieres",
            "bureaux_commerces",
        ],
        strategy: StrategyKind::Leboncoin,
    },
    SupportedHost {
        domain: "bienici.com",
        www: true,
        path_keywords: &[
            "annonce",
            "vente",
            "location",
            "appartement",
            "maison",
            "terrain",
        ],
        strategy: StrategyKind::BienIci,
    },
    SupportedHost {
        domain: "seloger.com",
        www: true,
        path_keywords: &[
            "annonces",
            "achat",
            "locations",
            "location",
            "appartement",
            "maison",
            "terrain",
        ],
        strategy: StrategyKind::Generic,
    },
    SupportedHost {
        domain: "paruvendu.fr",
        www: true,
        path_keywords: &["immobilier", "vente", "location", "maison", "appartement"],
        strategy: StrategyKind::Generic,
    },
    SupportedHost {
        domain: "guy-hoquet.com",
        www: true,
        path_keywords: &["biens", "result", "annonces"],
        strategy: StrategyKind::Generic,
    },
    SupportedHost {
        domain: "proprietes-privees.com",
        www: true,
        path_keywords: &["vente", "immobilier", "maison", "appartement"],
        strategy: StrategyKind::Generic,
    },
    SupportedHost {
        domain: "immobilier.lefigaro.fr",
        www: false,
        path_keywords: &["annonces", "annonce"],
        strategy: StrategyKind::Generic,
    },
    SupportedHost {
        domain: "immobilier.notaires.fr",
        www: true,
        path_keywords: &["fr", "annonces"],
        strategy: StrategyKind::Generic,
    },
];

/// Strip a leading `www.` and lower-case a host name.
pub fn bare_host(host: &str) -> String {
    let lower = host.to_ascii_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Exact lookup by host name, ignoring case and a leading `www.`.
pub fn find_host(host: &str) -> Option<&'static SupportedHost> {
    let bare = bare_host(host);
    SUPPORTED_HOSTS.iter().find(|h| h.domain == bare)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_host_ignores_www_and_case() {
        assert_eq!(find_host("WWW.LeBonCoin.fr").unwrap().domain, "leboncoin.fr");
        assert_eq!(find_host("bienici.com").unwrap().strategy, StrategyKind::BienIci);
        assert!(find_host("unknownsite.example").is_none());
    }

    #[test]
    fn subdomains_are_not_folded_into_their_parent() {
        assert!(find_host("lefigaro.fr").is_none());
        assert_eq!(
            find_host("immobilier.lefigaro.fr").unwrap().canonical_host(),
            "immobilier.lefigaro.fr"
        );
    }

    #[test]
    fn flattened_tokens_replace_dots() {
        let host = find_host("guy-hoquet.com").unwrap();
        assert_eq!(host.flattened_token(), "guy-hoquet-com");
        assert_eq!(host.canonical_host(), "www.guy-hoquet.com");
    }
}
