//! Recovery of canonical listing URLs from mangled identifiers.
//!
//! Identifiers reach us either as real URLs or as slugs produced by
//! flattening a URL into dashes, e.g.
//! `https-www-leboncoin-fr-ad-ventes-immobilieres-1234567890` for
//! `https://www.leboncoin.fr/ad/ventes_immobilieres/1234567890`.
//!
//! Re-expanding the flattened path is lossy. Only dashes sitting next to a
//! known path keyword of the host are turned back into `/`; slug words and
//! identifier runs are kept as opaque segments. A wrong guess would attach
//! another listing's data to the destination record, so anything without a
//! recognizable host fails instead.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;
use url::Url;

use crate::hosts::{self, SUPPORTED_HOSTS, SupportedHost};

const EXTERNAL_LINK_PREFIXES: &[&str] = &["external-link-"];

/// Checked in order; longer variants first.
const SCHEME_PREFIXES: &[&str] = &["https-www-", "http-www-", "https-", "http-", "www-"];

const FILE_EXTENSIONS: &[&str] = &["htm", "html", "php"];

/// Listing identifiers are runs of at least this many digits.
const MIN_IDENTIFIER_DIGITS: usize = 8;

/// Widest keyword, in dash-separated tokens.
const MAX_KEYWORD_TOKENS: usize = 4;

/// Why an identifier could not be turned into a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryFailure {
    #[error("no known host found in identifier")]
    NoKnownHost,

    #[error("reassembled URL is malformed: {0}")]
    MalformedAfterReassembly(String),
}

impl RecoveryFailure {
    /// Stable reason code reported to the caller.
    pub fn reason_code(&self) -> &'static str {
        match self {
            RecoveryFailure::NoKnownHost => "no_known_host",
            RecoveryFailure::MalformedAfterReassembly(_) => "malformed_after_reassembly",
        }
    }
}

/// A validated absolute listing URL.
///
/// Only [`recover`] builds one, so holding a `CanonicalUrl` means the
/// scheme and host have been normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Lower-cased host with any leading `www.` removed.
    pub fn host(&self) -> String {
        hosts::bare_host(self.0.host_str().unwrap_or_default())
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Serialize for CanonicalUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

/// Turn a raw identifier into a canonical URL, or fail explicitly.
pub fn recover(raw: &str) -> Result<CanonicalUrl, RecoveryFailure> {
    let raw = raw.trim();

    if let Some(url) = parse_absolute(raw) {
        return Ok(normalize_absolute(url));
    }

    let unwrapped = strip_prefix_ci(raw, EXTERNAL_LINK_PREFIXES).unwrap_or(raw);
    let flattened = flatten(unwrapped);
    let rest = strip_prefix_ci(&flattened, SCHEME_PREFIXES).unwrap_or(&flattened);

    let (host, path) = locate_host(rest).ok_or(RecoveryFailure::NoKnownHost)?;
    let segments = expand_path(path, host.path_keywords);

    tracing::debug!(
        host = host.domain,
        segments = ?segments,
        "Re-expanded flattened identifier"
    );

    reassemble(host, &segments)
}

fn parse_absolute(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    // `https:--www-…` parses with a dotless host; that is a slug, not a URL.
    let host = url.host_str()?;
    if !host.contains('.') {
        return None;
    }
    Some(url)
}

fn normalize_absolute(mut url: Url) -> CanonicalUrl {
    let host = url.host_str().unwrap_or_default().to_string();
    if let Some(supported) = hosts::find_host(&host) {
        let _ = url.set_scheme("https");
        let _ = url.set_port(None);
        let _ = url.set_host(Some(&supported.canonical_host()));
    }
    CanonicalUrl(url)
}

fn strip_prefix_ci<'a>(s: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|prefix| {
        let head = s.get(..prefix.len())?;
        head.eq_ignore_ascii_case(prefix)
            .then(|| &s[prefix.len()..])
    })
}

/// Drop query/fragment, turn leftover separators into dashes and collapse
/// dash runs.
fn flatten(raw: &str) -> String {
    let cut = raw
        .find(|c: char| c == '?' || c == '#')
        .map_or(raw, |idx| &raw[..idx]);

    let mut out = String::with_capacity(cut.len());
    for c in cut.chars() {
        let c = if matches!(c, ':' | '/' | '.' | '\\') { '-' } else { c };
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

/// Find the earliest supported host token sitting on dash boundaries.
///
/// Returns the host and the flattened path that follows it.
fn locate_host(s: &str) -> Option<(&'static SupportedHost, &str)> {
    // ASCII lower-casing keeps byte offsets valid for `s`.
    let lower = s.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut best: Option<(usize, usize, &'static SupportedHost)> = None;

    for host in SUPPORTED_HOSTS {
        let token = host.flattened_token();
        let found = lower.match_indices(token.as_str()).find(|(start, _)| {
            let end = start + token.len();
            let left = *start == 0 || bytes[start - 1] == b'-';
            let right = end == bytes.len() || bytes[end] == b'-';
            left && right
        });

        if let Some((start, _)) = found {
            let better = match best {
                None => true,
                Some((best_start, best_len, _)) => {
                    start < best_start || (start == best_start && token.len() > best_len)
                }
            };
            if better {
                best = Some((start, token.len(), host));
            }
        }
    }

    best.map(|(start, len, host)| (host, s[start + len..].trim_start_matches('-')))
}

fn expand_path(path: &str, keywords: &[&'static str]) -> Vec<String> {
    let mut tokens: Vec<&str> = path.split('-').filter(|t| !t.is_empty()).collect();

    let extension = if tokens.len() > 1 && tokens.last().is_some_and(|t| is_extension(t)) {
        tokens.pop()
    } else {
        None
    };

    let mut segments: Vec<String> = Vec::new();
    let mut slug: Vec<&str> = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        if let Some((keyword, width)) = match_keyword(&tokens[i..], keywords) {
            flush_slug(&mut slug, &mut segments);
            segments.push(keyword.to_string());
            i += width;
            continue;
        }

        // An identifier only stands alone at a segment start; after slug
        // words it belongs to the slug.
        if slug.is_empty() {
            let width = identifier_run(&tokens[i..]);
            if width > 0 {
                segments.push(tokens[i..i + width].join("-"));
                i += width;
                continue;
            }
        }

        slug.push(tokens[i]);
        i += 1;
    }
    flush_slug(&mut slug, &mut segments);

    if let (Some(ext), Some(last)) = (extension, segments.last_mut()) {
        last.push('.');
        last.push_str(ext);
    }

    segments
}

fn flush_slug(slug: &mut Vec<&str>, segments: &mut Vec<String>) {
    if !slug.is_empty() {
        segments.push(slug.join("-"));
        slug.clear();
    }
}

/// Longest keyword starting at `tokens[0]`, compared with `_` and `-`
/// treated alike. Returns the keyword's canonical spelling and its width.
fn match_keyword(tokens: &[&str], keywords: &[&'static str]) -> Option<(&'static str, usize)> {
    let max = tokens.len().min(MAX_KEYWORD_TOKENS);
    (1..=max).rev().find_map(|width| {
        let candidate = tokens[..width].join("-").replace('_', "-");
        keywords
            .iter()
            .find(|kw| kw.replace('_', "-").eq_ignore_ascii_case(&candidate))
            .map(|kw| (*kw, width))
    })
}

/// Width of a leading run of all-digit tokens, if the run holds an identifier.
fn identifier_run(tokens: &[&str]) -> usize {
    let run = tokens
        .iter()
        .take_while(|t| t.bytes().all(|b| b.is_ascii_digit()))
        .count();
    let has_identifier = tokens[..run].iter().any(|t| t.len() >= MIN_IDENTIFIER_DIGITS);
    if has_identifier { run } else { 0 }
}

fn is_extension(token: &str) -> bool {
    FILE_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(token))
}

fn reassemble(host: &SupportedHost, segments: &[String]) -> Result<CanonicalUrl, RecoveryFailure> {
    let mut candidate = format!("https://{}", host.canonical_host());
    for segment in segments {
        candidate.push('/');
        candidate.push_str(segment);
    }
    validate(&candidate, &host.canonical_host())
}

fn validate(candidate: &str, expected_host: &str) -> Result<CanonicalUrl, RecoveryFailure> {
    let url = Url::parse(candidate).map_err(|e| {
        RecoveryFailure::MalformedAfterReassembly(format!("{candidate}: {e}"))
    })?;
    if url.host_str() != Some(expected_host) {
        return Err(RecoveryFailure::MalformedAfterReassembly(format!(
            "{candidate}: host changed during reassembly"
        )));
    }
    Ok(CanonicalUrl(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recovered(raw: &str) -> String {
        recover(raw).unwrap().as_str().to_string()
    }

    #[test]
    fn leboncoin_slug_splits_keywords_and_keeps_identifier() {
        assert_eq!(
            recovered("https-www-leboncoin-fr-ad-ventes-immobilieres-1234567890"),
            "https://www.leboncoin.fr/ad/ventes_immobilieres/1234567890"
        );
    }

    #[test]
    fn absolute_urls_are_normalized_not_rebuilt() {
        assert_eq!(
            recovered("http://leboncoin.fr/ad/ventes_immobilieres/1234567890"),
            "https://www.leboncoin.fr/ad/ventes_immobilieres/1234567890"
        );
        assert_eq!(
            recovered("https://WWW.BIENICI.COM/annonce/vente/paris-11e/appartement/3pieces/abc-1"),
            "https://www.bienici.com/annonce/vente/paris-11e/appartement/3pieces/abc-1"
        );
        assert_eq!(
            recovered("https://www.immobilier.lefigaro.fr/annonces/annonce-12345678.html"),
            "https://immobilier.lefigaro.fr/annonces/annonce-12345678.html"
        );
    }

    #[test]
    fn recover_is_idempotent_for_supported_absolute_urls() {
        let inputs = [
            "https://www.leboncoin.fr/ad/ventes_immobilieres/1234567890",
            "http://bienici.com/annonce/vente/lyon-3e/maison/5pieces/xyz-42",
            "https://www.seloger.com/annonces/achat/appartement/paris-11eme-75/123456789.htm",
            "https://immobilier.lefigaro.fr/annonces/annonce-12345678.html?x=1",
            "https-www-leboncoin-fr-ad-locations-2345678901",
        ];
        for input in inputs {
            let once = recover(input).unwrap();
            let twice = recover(once.as_str()).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn unknown_absolute_hosts_pass_through() {
        assert_eq!(
            recovered("https://unknownsite.example/listing/42"),
            "https://unknownsite.example/listing/42"
        );
    }

    #[test]
    fn no_host_token_fails_with_no_known_host() {
        for raw in ["", "hello-world-12345678", "https-www-example-org-ad-1234567890", "ftp://leboncoin"] {
            let err = recover(raw).unwrap_err();
            assert_eq!(err, RecoveryFailure::NoKnownHost, "input {raw:?}");
            assert_eq!(err.reason_code(), "no_known_host");
        }
    }

    #[test]
    fn host_token_must_sit_on_dash_boundaries() {
        assert_eq!(
            recover("https-www-myleboncoin-fr-ad-1234567890").unwrap_err(),
            RecoveryFailure::NoKnownHost
        );
    }

    #[test]
    fn text_before_the_host_is_discarded() {
        assert_eq!(
            recovered("m-leboncoin-fr-ad-ventes-immobilieres-1234567890"),
            "https://www.leboncoin.fr/ad/ventes_immobilieres/1234567890"
        );
    }

    #[test]
    fn external_link_wrapper_is_stripped() {
        assert_eq!(
            recovered("external-link-https-www-leboncoin-fr-ad-locations-2345678901"),
            "https://www.leboncoin.fr/ad/locations/2345678901"
        );
    }

    #[test]
    fn schemeless_url_with_query_is_recovered_without_query() {
        assert_eq!(
            recovered("www.leboncoin.fr/ad/ventes_immobilieres/1234567890?utm_source=mail"),
            "https://www.leboncoin.fr/ad/ventes_immobilieres/1234567890"
        );
    }

    #[test]
    fn file_extension_is_reattached() {
        assert_eq!(
            recovered("https-www-leboncoin-fr-ventes-immobilieres-1234567890-htm"),
            "https://www.leboncoin.fr/ventes_immobilieres/1234567890.htm"
        );
    }

    #[test]
    fn subdomain_hosts_keep_their_own_form() {
        assert_eq!(
            recovered("https-immobilier-lefigaro-fr-annonces-annonce-12345678"),
            "https://immobilier.lefigaro.fr/annonces/annonce/12345678"
        );
    }

    #[test]
    fn host_without_path_recovers_to_site_root() {
        assert_eq!(recovered("https-www-leboncoin-fr"), "https://www.leboncoin.fr/");
    }

    // Ambiguous cases: the flattened form does not carry enough information
    // to restore every slash. These pin the conservative answer.

    #[test]
    fn ambiguous_slug_between_keywords_stays_whole() {
        // Original: /annonce/vente/paris-11e/appartement/3pieces/century-21-202_2541_57283
        assert_eq!(
            recovered(
                "https-www-bienici-com-annonce-vente-paris-11e-appartement-3pieces-century-21-202_2541_57283"
            ),
            "https://www.bienici.com/annonce/vente/paris-11e/appartement/3pieces-century-21-202_2541_57283"
        );
    }

    #[test]
    fn ambiguous_identifier_after_slug_words_stays_in_slug() {
        // Original: /annonces/achat/appartement/paris-11eme-75/123456789.htm
        assert_eq!(
            recovered("https-www-seloger-com-annonces-achat-appartement-paris-11eme-75-123456789-htm"),
            "https://www.seloger.com/annonces/achat/appartement/paris-11eme-75-123456789.htm"
        );
    }

    #[test]
    fn ambiguous_keyword_inside_slug_splits_it() {
        // "maison" is a path keyword, so "maison-de-ville" cannot survive.
        assert_eq!(
            recovered("https-www-bienici-com-annonce-location-maison-de-ville-12345678"),
            "https://www.bienici.com/annonce/location/maison/de-ville-12345678"
        );
    }

    #[test]
    fn digit_runs_around_identifier_are_kept_together() {
        assert_eq!(
            recovered("https-www-leboncoin-fr-ad-ventes-immobilieres-2024-1234567890"),
            "https://www.leboncoin.fr/ad/ventes_immobilieres/2024-1234567890"
        );
    }

    #[test]
    fn validate_rejects_unparseable_candidates() {
        let err = validate("https://www.leboncoin.fr:99999/ad", "www.leboncoin.fr").unwrap_err();
        assert_eq!(err.reason_code(), "malformed_after_reassembly");
    }

    #[test]
    fn canonical_url_host_strips_www() {
        let url = recover("https://www.leboncoin.fr/ad/1").unwrap();
        assert_eq!(url.host(), "leboncoin.fr");
        assert_eq!(url.to_string(), "https://www.leboncoin.fr/ad/1");
    }
}
