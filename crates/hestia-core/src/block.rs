//! Bot-block detection over fetched markup.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// A named signal that the page is a block or challenge, not the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIndicator {
    EmptyDocument,
    /// An image, frame or script loaded from the blocking vendor.
    VendorAsset,
    VendorMarker,
    CaptchaMarker,
    BlockedNotice,
}

impl BlockIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockIndicator::EmptyDocument => "empty_document",
            BlockIndicator::VendorAsset => "vendor_asset",
            BlockIndicator::VendorMarker => "vendor_marker",
            BlockIndicator::CaptchaMarker => "captcha_marker",
            BlockIndicator::BlockedNotice => "blocked_notice",
        }
    }
}

impl fmt::Display for BlockIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const VENDOR_MARKERS: &[&str] = &["datadome", "captcha-delivery"];

static VENDOR_ASSETS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"img[src*="datadome"], iframe[src*="datadome"], script[src*="datadome"], iframe[src*="captcha-delivery"], script[src*="captcha-delivery"]"#,
    )
    .expect("valid vendor asset selector")
});

// Word-bounded so "reCAPTCHA" script tags on ordinary pages do not trip it.
static CAPTCHA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcaptcha\b").expect("valid captcha regex"));

static BLOCKED_NOTICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)you\s+are\s+being\s+blocked").expect("valid notice regex"));

/// First indicator found in `html`, checked in a fixed order.
pub fn detect_block(html: &str) -> Option<BlockIndicator> {
    if html.trim().is_empty() {
        return Some(BlockIndicator::EmptyDocument);
    }

    let document = Html::parse_document(html);
    if document.select(&VENDOR_ASSETS).next().is_some() {
        return Some(BlockIndicator::VendorAsset);
    }

    let lower = html.to_lowercase();
    if VENDOR_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Some(BlockIndicator::VendorMarker);
    }
    if CAPTCHA_RE.is_match(html) {
        return Some(BlockIndicator::CaptchaMarker);
    }
    if BLOCKED_NOTICE_RE.is_match(html) {
        return Some(BlockIndicator::BlockedNotice);
    }
    None
}
