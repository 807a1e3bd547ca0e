use std::time::Duration;

use hestia_core::error::AppError;
use hestia_core::traits::BrowsingSession;
use hestia_core::util::pick_index;
use reqwest::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, UPGRADE_INSECURE_REQUESTS,
};

/// Desktop Chrome user agents; each session picks one at random.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
];

/// Plain HTTP session for sites that serve complete markup without scripts.
///
/// Sends the header set of a top-level browser navigation. The body is kept
/// whatever the status: anti-bot vendors answer 403 with a challenge page,
/// and block detection needs to see it.
pub struct HttpSession {
    client: Client,
    body: Option<String>,
    last_error: Option<AppError>,
}

impl HttpSession {
    pub fn new(proxy: Option<&str>) -> Result<Self, AppError> {
        let mut builder = Client::builder()
            .default_headers(browser_headers())
            .user_agent(USER_AGENTS[pick_index(USER_AGENTS.len())]);

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| AppError::ConfigError(format!("Invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            body: None,
            last_error: None,
        })
    }

    /// One GET bounded by `timeout`, covering the body read too.
    async fn get(&self, url: &str, timeout: Duration) -> Result<String, AppError> {
        let response = self.client.get(url).timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(timeout.as_secs())
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "Non-success status");
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(timeout.as_secs())
            } else {
                AppError::HttpError(format!("Failed to read response body: {e}"))
            }
        })
    }
}

/// Headers a browser sends on a top-level navigation (user agent aside).
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR,fr;q=0.9"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers
}

impl BrowsingSession for HttpSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), AppError> {
        match self.get(url, timeout).await {
            Ok(body) => {
                self.body = Some(body);
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.body = None;
                self.last_error = Some(AppError::HttpError(e.to_string()));
                Err(e)
            }
        }
    }

    /// Nothing renders after the response; the document is final.
    async fn settle(&mut self, _selectors: &[&str], _timeout: Duration) -> Result<bool, AppError> {
        Ok(self.body.is_some())
    }

    async fn content(&mut self) -> Result<String, AppError> {
        match (&self.body, self.last_error.take()) {
            (Some(body), _) => Ok(body.clone()),
            (None, Some(e)) => Err(e),
            (None, None) => Err(AppError::HttpError("No document loaded".into())),
        }
    }

    async fn close(self) {}
}
