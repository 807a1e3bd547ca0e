use std::fmt;

use serde::{Deserialize, Serialize};

use crate::recover::{CanonicalUrl, RecoveryFailure};

/// One unit of work: an identifier to recover and where its record goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRequest {
    pub raw_identifier: String,
    /// Existing CRM record to update. When absent the caller creates one.
    pub destination_id: Option<String>,
}

impl ListingRequest {
    pub fn new(raw_identifier: impl Into<String>, destination_id: Option<String>) -> Self {
        Self {
            raw_identifier: raw_identifier.into(),
            destination_id: destination_id.filter(|id| !id.trim().is_empty()),
        }
    }
}

/// How a strategy wants its pages fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchProfile {
    /// Headless browser on a persistent profile directory, stealth patches applied.
    PersistentBrowser,
    /// Throwaway headless browser context.
    EphemeralBrowser,
    /// Plain GET with browser-like headers.
    Http,
}

impl FetchProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchProfile::PersistentBrowser => "persistent_browser",
            FetchProfile::EphemeralBrowser => "ephemeral_browser",
            FetchProfile::Http => "http",
        }
    }
}

/// Why a fetch gave up without usable markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Blocked and no rotating proxy to retry through.
    NoRotationAvailable,
    /// Still blocked once every retry was spent.
    StillBlockedAfterRetries,
    /// The browsing context failed underneath us.
    InternalError,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::NoRotationAvailable => "no_rotation_available",
            BlockReason::StillBlockedAfterRetries => "still_blocked_after_retries",
            BlockReason::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the resilient fetch. Blocked outcomes never carry markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub html: String,
    pub blocked: bool,
    pub blocked_reason: Option<BlockReason>,
}

impl FetchOutcome {
    pub fn ready(html: String) -> Self {
        Self {
            html,
            blocked: false,
            blocked_reason: None,
        }
    }

    pub fn blocked(reason: BlockReason) -> Self {
        Self {
            html: String::new(),
            blocked: true,
            blocked_reason: Some(reason),
        }
    }
}

/// The normalized listing handed to the record sync.
///
/// Consumers must check `blocked` first: a blocked record has every
/// content field empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub title: String,
    pub description: String,
    pub image: String,
    pub city: String,
    pub price: String,
    pub price_value: Option<u64>,
    pub price_per_m2: String,
    pub surface_house: String,
    pub surface_land: String,
    pub phone: String,
    pub blocked: bool,
    pub blocked_reason: Option<BlockReason>,
}

impl ListingRecord {
    pub fn blocked(reason: BlockReason) -> Self {
        Self {
            blocked: true,
            blocked_reason: Some(reason),
            ..Self::default()
        }
    }

    /// Content fields the extraction cascade left empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("title", self.title.is_empty()),
            ("description", self.description.is_empty()),
            ("image", self.image.is_empty()),
            ("city", self.city.is_empty()),
            ("price", self.price.is_empty()),
            ("surfaceHouse", self.surface_house.is_empty()),
            ("surfaceLand", self.surface_land.is_empty()),
            ("phone", self.phone.is_empty()),
        ];
        fields
            .into_iter()
            .filter_map(|(name, missing)| missing.then_some(name))
            .collect()
    }

    /// True when no content field carries data.
    pub fn is_empty(&self) -> bool {
        self.missing_fields().len() == 8 && self.price_value.is_none() && self.price_per_m2.is_empty()
    }
}

/// What happened to one job.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    /// No URL could be recovered from the identifier.
    Unrecoverable {
        #[serde(serialize_with = "serialize_failure")]
        failure: RecoveryFailure,
    },
    /// The page was fetched (or found blocked) and extraction ran.
    Completed {
        url: CanonicalUrl,
        strategy: &'static str,
        record: ListingRecord,
    },
    /// The caller's outer timeout expired and the job was abandoned.
    TimedOut { url: Option<CanonicalUrl> },
}

impl JobOutcome {
    /// Whether recovery and fetch went through. Partial extraction still counts.
    pub fn proceeded(&self) -> bool {
        match self {
            JobOutcome::Completed { record, .. } => !record.blocked,
            JobOutcome::Unrecoverable { .. } | JobOutcome::TimedOut { .. } => false,
        }
    }

    pub fn url(&self) -> Option<&CanonicalUrl> {
        match self {
            JobOutcome::Completed { url, .. } => Some(url),
            JobOutcome::TimedOut { url } => url.as_ref(),
            JobOutcome::Unrecoverable { .. } => None,
        }
    }

    /// Short label for logs and summaries.
    pub fn label(&self) -> String {
        match self {
            JobOutcome::Unrecoverable { failure } => format!("unrecoverable ({})", failure.reason_code()),
            JobOutcome::Completed { record, .. } => match record.blocked_reason {
                Some(reason) => format!("blocked ({reason})"),
                None if record.is_empty() => "empty".to_string(),
                None => "extracted".to_string(),
            },
            JobOutcome::TimedOut { .. } => "timed out".to_string(),
        }
    }
}

fn serialize_failure<S: serde::Serializer>(
    failure: &RecoveryFailure,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(failure.reason_code())
}
