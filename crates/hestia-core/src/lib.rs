pub mod batch;
pub mod block;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod hosts;
pub mod models;
pub mod recover;
pub mod service;
pub mod traits;
pub mod util;

#[cfg(test)]
pub(crate) mod testutil;

pub use batch::{BatchDriver, BatchReport, BatchReporter, TracingBatchReporter};
pub use config::{BatchConfig, FetchConfig};
pub use dispatch::select_strategy;
pub use error::AppError;
pub use extract::ExtractionStrategy;
pub use fetch::ResilientFetcher;
pub use models::{BlockReason, FetchOutcome, FetchProfile, JobOutcome, ListingRecord, ListingRequest};
pub use recover::{CanonicalUrl, RecoveryFailure, recover};
pub use service::ListingService;
pub use traits::{BrowsingSession, NullSink, OutcomeSink, SessionFactory};
