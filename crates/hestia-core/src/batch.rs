use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::BatchConfig;
use crate::error::AppError;
use crate::models::{JobOutcome, ListingRequest};
use crate::recover::recover;
use crate::service::ListingService;
use crate::traits::{OutcomeSink, SessionFactory};
use crate::util::jitter;

/// Events emitted by the batch driver for monitoring/logging.
#[derive(Debug, Clone)]
pub enum BatchEvent<'a> {
    Started {
        jobs: usize,
    },
    JobStarted {
        index: usize,
        identifier: &'a str,
    },
    JobFinished {
        index: usize,
        outcome: &'a JobOutcome,
    },
    JobTimedOut {
        index: usize,
        identifier: &'a str,
        timeout: Duration,
    },
    SinkFailed {
        index: usize,
        error: &'a AppError,
    },
    Pacing {
        delay: Duration,
    },
    Cancelled {
        remaining: usize,
    },
    Finished {
        report: &'a BatchReport,
    },
}

/// Trait for receiving batch events (decoupled logging).
pub trait BatchReporter: Send + Sync {
    fn report(&self, event: BatchEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBatchReporter;

impl BatchReporter for TracingBatchReporter {
    fn report(&self, event: BatchEvent<'_>) {
        match event {
            BatchEvent::Started { jobs } => {
                tracing::info!(%jobs, "Batch started");
            }
            BatchEvent::JobStarted { index, identifier } => {
                tracing::info!(job = index + 1, %identifier, "Processing job");
            }
            BatchEvent::JobFinished { index, outcome } => {
                let url = outcome.url().map(|u| u.to_string()).unwrap_or_default();
                if outcome.proceeded() {
                    tracing::info!(job = index + 1, %url, outcome = %outcome.label(), "Job finished");
                } else {
                    tracing::warn!(job = index + 1, %url, outcome = %outcome.label(), "Job did not proceed");
                }
            }
            BatchEvent::JobTimedOut {
                index,
                identifier,
                timeout,
            } => {
                tracing::warn!(
                    job = index + 1,
                    %identifier,
                    timeout_secs = timeout.as_secs(),
                    "Job timed out, abandoned"
                );
            }
            BatchEvent::SinkFailed { index, error } => {
                tracing::error!(job = index + 1, %error, "Failed to deliver outcome");
            }
            BatchEvent::Pacing { delay } => {
                tracing::debug!(delay_ms = delay.as_millis() as u64, "Pacing before next job");
            }
            BatchEvent::Cancelled { remaining } => {
                tracing::info!(%remaining, "Batch cancelled");
            }
            BatchEvent::Finished { report } => {
                tracing::info!(
                    total = report.total,
                    extracted = report.extracted,
                    partial = report.partial,
                    blocked = report.blocked,
                    unrecoverable = report.unrecoverable,
                    timed_out = report.timed_out,
                    sink_errors = report.sink_errors,
                    "Batch finished"
                );
            }
        }
    }
}

/// Tally of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub processed: usize,
    /// Proceeded with every field filled.
    pub extracted: usize,
    /// Proceeded with some fields left empty.
    pub partial: usize,
    pub blocked: usize,
    pub unrecoverable: usize,
    pub timed_out: usize,
    pub sink_errors: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchReport {
    fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            extracted: 0,
            partial: 0,
            blocked: 0,
            unrecoverable: 0,
            timed_out: 0,
            sink_errors: 0,
            cancelled: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    fn record(&mut self, outcome: &JobOutcome) {
        self.processed += 1;
        match outcome {
            JobOutcome::Unrecoverable { .. } => self.unrecoverable += 1,
            JobOutcome::TimedOut { .. } => self.timed_out += 1,
            JobOutcome::Completed { record, .. } if record.blocked => self.blocked += 1,
            JobOutcome::Completed { record, .. } if record.missing_fields().is_empty() => {
                self.extracted += 1
            }
            JobOutcome::Completed { .. } => self.partial += 1,
        }
    }

    /// True when every job ran and none was unrecoverable, blocked or timed out.
    pub fn all_proceeded(&self) -> bool {
        !self.cancelled && self.processed == self.extracted + self.partial
    }
}

/// Runs jobs one after another with pacing, an outer timeout per job and
/// cooperative cancellation between jobs.
pub struct BatchDriver<F: SessionFactory> {
    service: ListingService<F>,
    config: BatchConfig,
}

impl<F: SessionFactory> BatchDriver<F> {
    pub fn new(service: ListingService<F>, config: BatchConfig) -> Self {
        Self { service, config }
    }

    /// Run the batch until every job is done or `cancel` fires.
    ///
    /// Failures never abort the batch. Each outcome is delivered to `sink`
    /// before the next job starts.
    pub async fn run<S: OutcomeSink, R: BatchReporter>(
        &self,
        jobs: Vec<ListingRequest>,
        sink: &S,
        cancel: CancellationToken,
        reporter: &R,
    ) -> BatchReport {
        let mut report = BatchReport::new(jobs.len());
        reporter.report(BatchEvent::Started { jobs: jobs.len() });

        for (index, job) in jobs.iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                reporter.report(BatchEvent::Cancelled {
                    remaining: jobs.len() - index,
                });
                break;
            }

            if index > 0 {
                let delay = self.config.pacing + jitter(self.config.jitter);
                if !delay.is_zero() {
                    reporter.report(BatchEvent::Pacing { delay });
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = cancel.cancelled() => {
                            report.cancelled = true;
                            reporter.report(BatchEvent::Cancelled {
                                remaining: jobs.len() - index,
                            });
                            break;
                        }
                    }
                }
            }

            reporter.report(BatchEvent::JobStarted {
                index,
                identifier: &job.raw_identifier,
            });

            let outcome = self.run_one(index, job, reporter).await;
            report.record(&outcome);
            reporter.report(BatchEvent::JobFinished {
                index,
                outcome: &outcome,
            });

            if let Err(error) = sink.deliver(job, &outcome).await {
                report.sink_errors += 1;
                reporter.report(BatchEvent::SinkFailed {
                    index,
                    error: &error,
                });
            }
        }

        report.finished_at = Some(Utc::now());
        reporter.report(BatchEvent::Finished { report: &report });
        report
    }

    async fn run_one<R: BatchReporter>(
        &self,
        index: usize,
        job: &ListingRequest,
        reporter: &R,
    ) -> JobOutcome {
        match tokio::time::timeout(self.config.job_timeout, self.service.process(job)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                reporter.report(BatchEvent::JobTimedOut {
                    index,
                    identifier: &job.raw_identifier,
                    timeout: self.config.job_timeout,
                });
                JobOutcome::TimedOut {
                    url: recover(&job.raw_identifier).ok(),
                }
            }
        }
    }
}
