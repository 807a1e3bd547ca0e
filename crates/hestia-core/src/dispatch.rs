use crate::extract::{BienIciStrategy, ExtractionStrategy, GenericStrategy, LeboncoinStrategy};
use crate::hosts::{StrategyKind, find_host};
use crate::recover::CanonicalUrl;

static LEBONCOIN: LeboncoinStrategy = LeboncoinStrategy;
static BIENICI: BienIciStrategy = BienIciStrategy;
static GENERIC: GenericStrategy = GenericStrategy;

/// Strategy for a host name, generic when the host has no dedicated ruleset.
pub fn strategy_for_host(host: &str) -> &'static dyn ExtractionStrategy {
    match find_host(host).map(|h| h.strategy) {
        Some(StrategyKind::Leboncoin) => &LEBONCOIN,
        Some(StrategyKind::BienIci) => &BIENICI,
        Some(StrategyKind::Generic) | None => &GENERIC,
    }
}

pub fn select_strategy(url: &CanonicalUrl) -> &'static dyn ExtractionStrategy {
    strategy_for_host(&url.host())
}
