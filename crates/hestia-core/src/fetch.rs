//! Bot-aware page fetch with block detection and bounded retries.

use crate::block::detect_block;
use crate::config::FetchConfig;
use crate::models::{BlockReason, FetchOutcome, FetchProfile};
use crate::traits::{BrowsingSession, SessionFactory};

/// Drives one session through navigate → settle → block check, retrying
/// through the rotating proxy when one is configured.
#[derive(Clone)]
pub struct ResilientFetcher<F: SessionFactory> {
    factory: F,
    config: FetchConfig,
}

impl<F: SessionFactory> ResilientFetcher<F> {
    pub fn new(factory: F, config: FetchConfig) -> Self {
        Self { factory, config }
    }

    /// Fetch `url` with the given profile.
    ///
    /// Never fails: session and content errors come back as a blocked
    /// outcome with [`BlockReason::InternalError`]. The session is closed
    /// before returning.
    pub async fn fetch(
        &self,
        url: &str,
        profile: FetchProfile,
        settle_selectors: &[&str],
    ) -> FetchOutcome {
        let mut session = match self.factory.open(profile).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(%url, profile = profile.as_str(), error = %e, "Failed to open session");
                return FetchOutcome::blocked(BlockReason::InternalError);
            }
        };

        let outcome = self.attempt_loop(&mut session, url, settle_selectors).await;
        session.close().await;
        outcome
    }

    async fn attempt_loop(
        &self,
        session: &mut F::Session,
        url: &str,
        settle_selectors: &[&str],
    ) -> FetchOutcome {
        let mut attempt: u32 = 0;
        loop {
            let nav = tokio::time::timeout(
                self.config.navigation_timeout,
                session.navigate(url, self.config.navigation_timeout),
            )
            .await;
            match nav {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(%url, attempt, error = %e, "Navigation error ignored"),
                Err(_) => tracing::debug!(%url, attempt, "Navigation timed out, continuing"),
            }

            tokio::time::sleep(self.config.grace).await;

            let settled = tokio::time::timeout(
                self.config.settle_timeout,
                session.settle(settle_selectors, self.config.settle_timeout),
            )
            .await;
            if let Ok(Err(e)) = settled {
                tracing::debug!(%url, attempt, error = %e, "Settle error ignored");
            }

            let html = match session.content().await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(%url, attempt, error = %e, "Failed to read page content");
                    return FetchOutcome::blocked(BlockReason::InternalError);
                }
            };

            let Some(indicator) = detect_block(&html) else {
                tracing::debug!(%url, attempt, bytes = html.len(), "Page ready");
                return FetchOutcome::ready(html);
            };

            if !self.factory.has_rotation() {
                tracing::warn!(%url, %indicator, "Blocked and no rotating proxy configured");
                return FetchOutcome::blocked(BlockReason::NoRotationAvailable);
            }

            if attempt >= self.config.retries {
                tracing::warn!(%url, %indicator, attempts = attempt + 1, "Still blocked after retries");
                return FetchOutcome::blocked(BlockReason::StillBlockedAfterRetries);
            }

            attempt += 1;
            let backoff = self.config.backoff(attempt);
            tracing::info!(
                %url,
                %indicator,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "Blocked, retrying through proxy"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}
