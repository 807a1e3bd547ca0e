//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::batch::{BatchEvent, BatchReporter};
use crate::error::AppError;
use crate::models::{FetchProfile, JobOutcome, ListingRequest};
use crate::traits::{BrowsingSession, OutcomeSink, SessionFactory};

// ---------------------------------------------------------------------------
// MockSession / MockSessionFactory
// ---------------------------------------------------------------------------

/// Calls observed across every session a factory opened.
#[derive(Debug, Default)]
pub struct SessionLog {
    pub opened: Vec<FetchProfile>,
    pub navigations: Vec<String>,
    pub settles: usize,
    pub closed: usize,
    pub dropped: usize,
}

/// Mock session that serves queued documents, one per `content` call.
pub struct MockSession {
    contents: Arc<Mutex<Vec<Result<String, AppError>>>>,
    navigate_error: bool,
    /// Artificial navigation latency, to exercise outer timeouts.
    navigate_delay: Duration,
    log: Arc<Mutex<SessionLog>>,
}

impl BrowsingSession for MockSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), AppError> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        if !self.navigate_delay.is_zero() {
            tokio::time::sleep(self.navigate_delay).await;
        }
        if self.navigate_error {
            return Err(AppError::BrowserError("net::ERR_TIMED_OUT".into()));
        }
        Ok(())
    }

    async fn settle(&mut self, _selectors: &[&str], _timeout: Duration) -> Result<bool, AppError> {
        self.log.lock().unwrap().settles += 1;
        Ok(true)
    }

    async fn content(&mut self) -> Result<String, AppError> {
        let mut contents = self.contents.lock().unwrap();
        if contents.is_empty() {
            Ok("<html><body><h1>default</h1></body></html>".to_string())
        } else {
            contents.remove(0)
        }
    }

    async fn close(self) {
        self.log.lock().unwrap().closed += 1;
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.dropped += 1;
        }
    }
}

/// Mock factory handing out [`MockSession`]s over a shared document queue.
#[derive(Clone)]
pub struct MockSessionFactory {
    contents: Arc<Mutex<Vec<Result<String, AppError>>>>,
    open_error: Arc<Mutex<Option<AppError>>>,
    rotation: bool,
    navigate_error: bool,
    navigate_delay: Duration,
    pub log: Arc<Mutex<SessionLog>>,
}

impl MockSessionFactory {
    /// Every `content` call returns the next document; defaults when exhausted.
    pub fn with_documents(documents: Vec<&str>) -> Self {
        Self::with_contents(documents.into_iter().map(|d| Ok(d.to_string())).collect())
    }

    pub fn with_contents(contents: Vec<Result<String, AppError>>) -> Self {
        Self {
            contents: Arc::new(Mutex::new(contents)),
            open_error: Arc::new(Mutex::new(None)),
            rotation: false,
            navigate_error: false,
            navigate_delay: Duration::ZERO,
            log: Arc::new(Mutex::new(SessionLog::default())),
        }
    }

    pub fn with_open_error(error: AppError) -> Self {
        let factory = Self::with_contents(Vec::new());
        *factory.open_error.lock().unwrap() = Some(error);
        factory
    }

    /// Pretend a rotating proxy is configured.
    pub fn rotating(mut self) -> Self {
        self.rotation = true;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.navigate_error = true;
        self
    }

    pub fn slow_navigation(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }

    pub fn navigations(&self) -> usize {
        self.log.lock().unwrap().navigations.len()
    }
}

impl SessionFactory for MockSessionFactory {
    type Session = MockSession;

    async fn open(&self, profile: FetchProfile) -> Result<MockSession, AppError> {
        if let Some(e) = self.open_error.lock().unwrap().take() {
            return Err(e);
        }
        self.log.lock().unwrap().opened.push(profile);
        Ok(MockSession {
            contents: self.contents.clone(),
            navigate_error: self.navigate_error,
            navigate_delay: self.navigate_delay,
            log: self.log.clone(),
        })
    }

    fn has_rotation(&self) -> bool {
        self.rotation
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Sink that records every delivered outcome label.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub delivered: Arc<Mutex<Vec<(ListingRequest, String)>>>,
    errors: Arc<Mutex<Vec<AppError>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next deliveries fail with these errors, in order.
    pub fn with_errors(errors: Vec<AppError>) -> Self {
        Self {
            delivered: Arc::new(Mutex::new(Vec::new())),
            errors: Arc::new(Mutex::new(errors)),
        }
    }

    pub fn labels(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(_, label)| label.clone())
            .collect()
    }
}

impl OutcomeSink for RecordingSink {
    async fn deliver(&self, request: &ListingRequest, outcome: &JobOutcome) -> Result<(), AppError> {
        self.delivered
            .lock()
            .unwrap()
            .push((request.clone(), outcome.label()));
        let mut errors = self.errors.lock().unwrap();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.remove(0))
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Batch reporter that records event names.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == name)
            .count()
    }
}

impl BatchReporter for RecordingReporter {
    fn report(&self, event: BatchEvent<'_>) {
        let label = match &event {
            BatchEvent::Started { .. } => "Started",
            BatchEvent::JobStarted { .. } => "JobStarted",
            BatchEvent::JobFinished { .. } => "JobFinished",
            BatchEvent::JobTimedOut { .. } => "JobTimedOut",
            BatchEvent::SinkFailed { .. } => "SinkFailed",
            BatchEvent::Pacing { .. } => "Pacing",
            BatchEvent::Cancelled { .. } => "Cancelled",
            BatchEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

pub const BLOCKED_PAGE: &str =
    r#"<html><body><iframe src="https://geo.captcha-delivery.com/captcha/"></iframe></body></html>"#;

pub const LEBONCOIN_PAGE: &str = r#"<html>
<head>
  <meta property="og:image" content="//img.leboncoin.fr/api/v1/lbcpb1/images/ab/cd/ef.jpg">
  <meta name="description" content="Belle maison familiale avec jardin.">
  <script type="application/ld+json">
    {"@context":"https://schema.org","@type":"Product","name":"Maison 5 pièces 100 m²",
     "offers":{"@type":"Offer","price":"300000","priceCurrency":"EUR"}}
  </script>
</head>
<body>
  <h1 data-qa-id="adview_title">Maison 5 pièces 100 m²</h1>
  <div data-qa-id="adview_price"><p>300&nbsp;000&nbsp;€</p></div>
  <div data-qa-id="adview_location"><a>Montreuil 93100</a></div>
  <div data-qa-id="criteria_item_square"><p>Surface habitable</p><p>100 m²</p></div>
  <div data-qa-id="criteria_item_land_plot_surface"><p>Surface totale du terrain</p><p>450 m²</p></div>
  <div data-qa-id="adview_description_container">Belle maison familiale avec jardin. Contact 06 12 34 56 78.</div>
</body>
</html>"#;

pub fn request(raw: &str) -> ListingRequest {
    ListingRequest::new(raw, None)
}
