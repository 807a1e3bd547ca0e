use crate::dispatch::select_strategy;
use crate::extract::ExtractionStrategy;
use crate::fetch::ResilientFetcher;
use crate::models::{BlockReason, JobOutcome, ListingRecord, ListingRequest};
use crate::recover::{CanonicalUrl, recover};
use crate::traits::SessionFactory;

/// Runs one job end to end: recover → dispatch → fetch → extract.
///
/// Generic over the session factory, so tests drive it with mocks instead
/// of a real browser.
pub struct ListingService<F: SessionFactory> {
    fetcher: ResilientFetcher<F>,
}

impl<F: SessionFactory> ListingService<F> {
    pub fn new(fetcher: ResilientFetcher<F>) -> Self {
        Self { fetcher }
    }

    /// Process a single request. Never fails: every problem ends up in the outcome.
    pub async fn process(&self, request: &ListingRequest) -> JobOutcome {
        let url = match recover(&request.raw_identifier) {
            Ok(url) => url,
            Err(failure) => {
                tracing::warn!(
                    identifier = %request.raw_identifier,
                    reason = failure.reason_code(),
                    "Could not recover a listing URL"
                );
                return JobOutcome::Unrecoverable { failure };
            }
        };

        let strategy = select_strategy(&url);
        tracing::info!(%url, strategy = strategy.name(), "Recovered listing URL");

        let record = self.extract_url(strategy, &url).await;
        JobOutcome::Completed {
            url,
            strategy: strategy.name(),
            record,
        }
    }

    /// Fetch `url` the way `strategy` needs and extract a record from it.
    pub async fn extract_url(
        &self,
        strategy: &dyn ExtractionStrategy,
        url: &CanonicalUrl,
    ) -> ListingRecord {
        let outcome = self
            .fetcher
            .fetch(
                url.as_str(),
                strategy.fetch_profile(),
                strategy.settle_selectors(),
            )
            .await;

        if outcome.blocked {
            let reason = outcome.blocked_reason.unwrap_or(BlockReason::InternalError);
            tracing::warn!(%url, %reason, "Listing blocked");
            return ListingRecord::blocked(reason);
        }

        let record = strategy.extract(&outcome.html, url.as_url());
        let missing = record.missing_fields();
        if missing.is_empty() {
            tracing::info!(%url, "All fields extracted");
        } else {
            tracing::warn!(%url, strategy = strategy.name(), ?missing, "Partial extraction");
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::models::FetchProfile;
    use crate::recover::RecoveryFailure;
    use crate::testutil::*;

    fn service(factory: MockSessionFactory) -> ListingService<MockSessionFactory> {
        ListingService::new(ResilientFetcher::new(factory, FetchConfig::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn mangled_identifier_goes_end_to_end() {
        let factory = MockSessionFactory::with_documents(vec![LEBONCOIN_PAGE]);
        let outcome = service(factory.clone())
            .process(&request(
                "https-www-leboncoin-fr-ad-ventes-immobilieres-1234567890",
            ))
            .await;

        let JobOutcome::Completed {
            url,
            strategy,
            record,
        } = &outcome
        else {
            panic!("expected a completed job, got {outcome:?}");
        };
        assert_eq!(
            url.as_str(),
            "https://www.leboncoin.fr/ad/ventes_immobilieres/1234567890"
        );
        assert_eq!(*strategy, "leboncoin");
        assert_eq!(record.price_per_m2, "3 000 €/m²");
        assert!(outcome.proceeded());

        let log = factory.log.lock().unwrap();
        assert_eq!(log.opened, vec![FetchProfile::PersistentBrowser]);
        assert_eq!(log.navigations, vec![url.as_str().to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn unrecoverable_identifier_never_opens_a_session() {
        let factory = MockSessionFactory::with_documents(vec![LEBONCOIN_PAGE]);
        let outcome = service(factory.clone())
            .process(&request("hello-world-12345678"))
            .await;

        assert!(matches!(
            outcome,
            JobOutcome::Unrecoverable {
                failure: RecoveryFailure::NoKnownHost
            }
        ));
        assert!(factory.log.lock().unwrap().opened.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_page_yields_blocked_record() {
        let factory = MockSessionFactory::with_documents(vec![BLOCKED_PAGE]);
        let outcome = service(factory)
            .process(&request("https://www.leboncoin.fr/ad/ventes_immobilieres/1234567890"))
            .await;

        let JobOutcome::Completed { record, .. } = &outcome else {
            panic!("expected a completed job, got {outcome:?}");
        };
        assert_eq!(record, &ListingRecord::blocked(BlockReason::NoRotationAvailable));
        assert!(!outcome.proceeded());
    }

    #[tokio::test(start_paused = true)]
    async fn extract_url_uses_the_strategy_profile() {
        let factory = MockSessionFactory::with_documents(vec!["<html><body><h1>Studio</h1></body></html>"]);
        let svc = service(factory.clone());
        let url = recover("https://www.bienici.com/annonce/location/paris/studio/1").unwrap();

        let record = svc.extract_url(select_strategy(&url), &url).await;

        assert_eq!(record.title, "Studio");
        assert_eq!(factory.log.lock().unwrap().opened, vec![FetchProfile::Http]);
    }
}
