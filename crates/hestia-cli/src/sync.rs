use std::time::Duration;

use hestia_client::{NotionClient, PagePayload, SyncStatus};
use hestia_core::error::AppError;
use hestia_core::models::{JobOutcome, ListingRequest};
use hestia_core::traits::OutcomeSink;

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// What to do with the Notion card for one job.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncPlan<'a> {
    Create {
        database_id: &'a str,
        payload: PagePayload,
    },
    Update {
        page_id: &'a str,
        payload: PagePayload,
    },
    Skip {
        reason: &'static str,
    },
}

/// Decide between creating a card, updating the destination card, or
/// leaving Notion alone.
///
/// A completed job (blocked included) always produces a card: it updates
/// the destination when one was given, otherwise a new card is created.
/// A blocked update only flips the status, leaving the card's content as
/// it was. A job without a URL only marks an existing destination as failed.
pub fn plan_sync<'a>(
    request: &'a ListingRequest,
    outcome: &JobOutcome,
    database_id: Option<&'a str>,
) -> SyncPlan<'a> {
    let destination = request.destination_id.as_deref();
    match outcome {
        JobOutcome::Completed { url, record, .. } => match (destination, database_id) {
            (Some(page_id), _) if record.blocked => SyncPlan::Update {
                page_id,
                payload: PagePayload::blocked_update(url.as_str()),
            },
            (Some(page_id), _) => SyncPlan::Update {
                page_id,
                payload: PagePayload::for_record(record, url.as_str()),
            },
            (None, Some(database_id)) => SyncPlan::Create {
                database_id,
                payload: PagePayload::for_record(record, url.as_str()),
            },
            (None, None) => SyncPlan::Skip {
                reason: "no destination and no database configured",
            },
        },
        JobOutcome::Unrecoverable { .. } | JobOutcome::TimedOut { .. } => match destination {
            Some(page_id) => SyncPlan::Update {
                page_id,
                payload: PagePayload::status_only(SyncStatus::Error),
            },
            None => SyncPlan::Skip {
                reason: "failed job without a destination card",
            },
        },
    }
}

/// Pushes each outcome to Notion, retrying a transient failure once.
pub struct NotionOutcomeSink {
    client: NotionClient,
    database_id: Option<String>,
}

impl NotionOutcomeSink {
    pub fn new(client: NotionClient, database_id: Option<String>) -> Self {
        Self {
            client,
            database_id,
        }
    }

    async fn execute(&self, plan: &SyncPlan<'_>) -> Result<Option<String>, AppError> {
        match plan {
            SyncPlan::Create {
                database_id,
                payload,
            } => self.client.create_page(database_id, payload).await.map(Some),
            SyncPlan::Update { page_id, payload } => {
                self.client.update_page(page_id, payload).await.map(Some)
            }
            SyncPlan::Skip { .. } => Ok(None),
        }
    }
}

impl OutcomeSink for NotionOutcomeSink {
    async fn deliver(&self, request: &ListingRequest, outcome: &JobOutcome) -> Result<(), AppError> {
        let plan = plan_sync(request, outcome, self.database_id.as_deref());
        if let SyncPlan::Skip { reason } = plan {
            tracing::warn!(identifier = %request.raw_identifier, reason, "Notion sync skipped");
            return Ok(());
        }

        let page_id = match self.execute(&plan).await {
            Err(e) if e.is_retryable() => {
                tracing::warn!(error = %e, "Notion sync failed, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                self.execute(&plan).await?
            }
            other => other?,
        };

        if let Some(page_id) = page_id {
            let action = if matches!(plan, SyncPlan::Create { .. }) {
                "created"
            } else {
                "updated"
            };
            tracing::info!(%page_id, action, "Notion card synced");
        }
        Ok(())
    }
}

/// Prints every outcome as JSON on stdout, then hands it to the Notion
/// sink when sync is enabled.
pub struct CliSink {
    notion: Option<NotionOutcomeSink>,
    pretty: bool,
}

impl CliSink {
    pub fn new(notion: Option<NotionOutcomeSink>, pretty: bool) -> Self {
        Self { notion, pretty }
    }
}

impl OutcomeSink for CliSink {
    async fn deliver(&self, request: &ListingRequest, outcome: &JobOutcome) -> Result<(), AppError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(outcome)?
        } else {
            serde_json::to_string(outcome)?
        };
        println!("{json}");

        match &self.notion {
            Some(notion) => notion.deliver(request, outcome).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hestia_core::models::{BlockReason, ListingRecord};
    use hestia_core::recover::{RecoveryFailure, recover};

    const URL: &str = "https://www.leboncoin.fr/ad/ventes_immobilieres/1234567890";

    fn completed(record: ListingRecord) -> JobOutcome {
        JobOutcome::Completed {
            url: recover(URL).unwrap(),
            strategy: "leboncoin",
            record,
        }
    }

    fn request(destination: Option<&str>) -> ListingRequest {
        ListingRequest::new(URL, destination.map(str::to_string))
    }

    #[test]
    fn completed_with_destination_updates() {
        let req = request(Some("page-1"));
        let record = ListingRecord {
            title: "Maison".into(),
            ..ListingRecord::default()
        };
        let plan = plan_sync(&req, &completed(record), Some("db"));

        let SyncPlan::Update { page_id, payload } = plan else {
            panic!("expected an update, got {plan:?}");
        };
        assert_eq!(page_id, "page-1");
        assert_eq!(payload.status(), Some("🟢 Scrappé"));
    }

    #[test]
    fn completed_without_destination_creates() {
        let req = request(None);
        let plan = plan_sync(&req, &completed(ListingRecord::default()), Some("db"));
        assert!(matches!(plan, SyncPlan::Create { database_id: "db", .. }));
    }

    #[test]
    fn blocked_without_destination_still_creates_a_card() {
        let req = request(None);
        let outcome = completed(ListingRecord::blocked(BlockReason::StillBlockedAfterRetries));

        let SyncPlan::Create { payload, .. } = plan_sync(&req, &outcome, Some("db")) else {
            panic!("expected a create");
        };
        assert_eq!(payload.status(), Some("🟠 Bloqué"));
        assert_eq!(payload.cover, None);
    }

    #[test]
    fn blocked_rescrape_keeps_existing_card_content() {
        let req = request(Some("page-3"));
        let outcome = completed(ListingRecord::blocked(BlockReason::NoRotationAvailable));

        let SyncPlan::Update { page_id, payload } = plan_sync(&req, &outcome, Some("db")) else {
            panic!("expected an update");
        };
        assert_eq!(page_id, "page-3");
        assert_eq!(payload.status(), Some("🟠 Bloqué"));
        for field in ["Title", "Prix", "Prix/m2", "Surface maison", "Surface terrain", "Ville", "Description"] {
            assert!(!payload.properties.contains_key(field), "{field} would be overwritten");
        }
        let url = payload.properties["URL"]["url"].as_str().unwrap();
        assert!(url.ends_with("1234567890"), "{url}");
    }

    #[test]
    fn nowhere_to_write_skips() {
        let req = request(None);
        let plan = plan_sync(&req, &completed(ListingRecord::default()), None);
        assert!(matches!(plan, SyncPlan::Skip { .. }));
    }

    #[test]
    fn unrecoverable_marks_destination_as_error() {
        let req = request(Some("page-7"));
        let outcome = JobOutcome::Unrecoverable {
            failure: RecoveryFailure::NoKnownHost,
        };

        let SyncPlan::Update { page_id, payload } = plan_sync(&req, &outcome, Some("db")) else {
            panic!("expected an update");
        };
        assert_eq!(page_id, "page-7");
        assert_eq!(payload, PagePayload::status_only(SyncStatus::Error));
    }

    #[test]
    fn failed_job_without_destination_is_not_synced() {
        let req = request(None);
        let outcome = JobOutcome::TimedOut { url: None };
        assert!(matches!(
            plan_sync(&req, &outcome, Some("db")),
            SyncPlan::Skip { .. }
        ));
    }
}
