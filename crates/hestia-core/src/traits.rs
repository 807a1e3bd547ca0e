use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{FetchProfile, JobOutcome, ListingRequest};

/// One isolated browsing context, owned by a single fetch.
///
/// Implementations must also release their resources on `Drop`, so a fetch
/// abandoned mid-flight (outer timeout, cancellation) never leaks a browser.
pub trait BrowsingSession: Send {
    /// Navigate to `url`, giving up after `timeout`.
    fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Wait until one of `selectors` is present or the page goes quiet,
    /// bounded by `timeout`. Returns whether a selector matched.
    fn settle(
        &mut self,
        selectors: &[&str],
        timeout: Duration,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Serialized markup of the current document.
    fn content(&mut self) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Close the context and release its process or connection.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Opens browsing sessions for a fetch profile.
pub trait SessionFactory: Send + Sync + Clone {
    type Session: BrowsingSession;

    /// Acquire a fresh session with anti-fingerprinting already applied.
    fn open(
        &self,
        profile: FetchProfile,
    ) -> impl Future<Output = Result<Self::Session, AppError>> + Send;

    /// Whether a rotating proxy is configured. Without one, a blocked
    /// fetch gives up immediately.
    fn has_rotation(&self) -> bool;
}

/// Receives the outcome of each job (e.g. the CRM record sync).
pub trait OutcomeSink: Send + Sync {
    fn deliver(
        &self,
        request: &ListingRequest,
        outcome: &JobOutcome,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A no-op OutcomeSink for use when results are only printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutcomeSink for NullSink {
    async fn deliver(&self, _request: &ListingRequest, _outcome: &JobOutcome) -> Result<(), AppError> {
        Ok(())
    }
}
