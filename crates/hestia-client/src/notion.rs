use std::time::Duration;

use hestia_core::error::AppError;
use hestia_core::models::ListingRecord;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the select property carrying the sync status.
pub const STATUS_PROPERTY: &str = "Scrapping";

/// Value of the status select on a synced card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Scraped,
    Blocked,
    Error,
}

impl SyncStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SyncStatus::Scraped => "🟢 Scrappé",
            SyncStatus::Blocked => "🟠 Bloqué",
            SyncStatus::Error => "🔴 Erreur",
        }
    }
}

/// Properties and optional cover for one page write.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePayload {
    pub properties: Map<String, Value>,
    pub cover: Option<String>,
}

impl PagePayload {
    /// Full card for an extracted (or blocked) listing.
    ///
    /// The cover is only set for an unblocked record with an image. An
    /// empty title falls back to the URL so the card stays identifiable.
    pub fn for_record(record: &ListingRecord, url: &str) -> Self {
        let status = if record.blocked {
            SyncStatus::Blocked
        } else {
            SyncStatus::Scraped
        };
        let title = if record.title.is_empty() {
            url
        } else {
            record.title.as_str()
        };

        let mut properties = Map::new();
        properties.insert("Title".into(), json!({ "title": [text(title)] }));
        properties.insert(STATUS_PROPERTY.into(), select(status));
        for (name, value) in [
            ("Prix", &record.price),
            ("Prix/m2", &record.price_per_m2),
            ("Surface maison", &record.surface_house),
            ("Surface terrain", &record.surface_land),
            ("Ville", &record.city),
            ("Description", &record.description),
        ] {
            properties.insert(name.into(), rich_text(value));
        }
        properties.insert("URL".into(), json!({ "url": url }));
        if !record.phone.is_empty() {
            properties.insert("Téléphone".into(), rich_text(&record.phone));
        }

        let cover = (!record.blocked && !record.image.is_empty()).then(|| record.image.clone());
        Self { properties, cover }
    }

    /// Update for an existing card whose listing came back blocked. Only
    /// the status and URL are written so earlier content survives.
    pub fn blocked_update(url: &str) -> Self {
        let mut payload = Self::status_only(SyncStatus::Blocked);
        payload
            .properties
            .insert("URL".into(), json!({ "url": url }));
        payload
    }

    /// Status-only update, for jobs that never produced a record.
    pub fn status_only(status: SyncStatus) -> Self {
        let mut properties = Map::new();
        properties.insert(STATUS_PROPERTY.into(), select(status));
        Self {
            properties,
            cover: None,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.properties
            .get(STATUS_PROPERTY)?
            .pointer("/select/name")?
            .as_str()
    }
}

fn text(content: &str) -> Value {
    json!({ "text": { "content": content } })
}

fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [text(content)] })
}

fn select(status: SyncStatus) -> Value {
    json!({ "select": { "name": status.label() } })
}

/// Minimal client for the Notion pages API.
#[derive(Clone)]
pub struct NotionClient {
    client: Client,
    base_url: String,
    token: String,
    timeout_secs: u64,
}

impl NotionClient {
    pub fn new(token: &str) -> Result<Self, AppError> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        })
    }

    /// Create a card in `database_id`. Returns the new page id.
    pub async fn create_page(
        &self,
        database_id: &str,
        payload: &PagePayload,
    ) -> Result<String, AppError> {
        let body = CreatePageRequest {
            parent: Parent { database_id },
            properties: &payload.properties,
            cover: payload.cover.as_deref().map(Cover::external),
        };
        let request = self.client.post(format!("{}/pages", self.base_url)).json(&body);
        self.send(request).await
    }

    /// Update an existing card. Returns the page id.
    pub async fn update_page(&self, page_id: &str, payload: &PagePayload) -> Result<String, AppError> {
        let body = UpdatePageRequest {
            properties: &payload.properties,
            cover: payload.cover.as_deref().map(Cover::external),
        };
        let request = self
            .client
            .patch(format!("{}/pages/{}", self.base_url, page_id))
            .json(&body);
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, AppError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| format!("{}: {}", e.code, e.message))
                .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));
            return Err(AppError::SinkError {
                message,
                status_code,
            });
        }

        let page: PageResponse = response
            .json()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to parse Notion response: {e}")))?;
        Ok(page.id)
    }
}

// ---- Notion API types ----

#[derive(Serialize)]
struct CreatePageRequest<'a> {
    parent: Parent<'a>,
    properties: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover: Option<Cover<'a>>,
}

#[derive(Serialize)]
struct UpdatePageRequest<'a> {
    properties: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover: Option<Cover<'a>>,
}

#[derive(Serialize)]
struct Parent<'a> {
    database_id: &'a str,
}

#[derive(Serialize)]
struct Cover<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    external: External<'a>,
}

impl<'a> Cover<'a> {
    fn external(url: &'a str) -> Self {
        Self {
            kind: "external",
            external: External { url },
        }
    }
}

#[derive(Serialize)]
struct External<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct PageResponse {
    id: String,
}

#[derive(Deserialize)]
struct ApiError {
    code: String,
    message: String,
}
