//! Job status polling.
//!
//! After a job is staged the poller issues one GET per tick against
//! `{ingestion_url}/{uuid}/status` until the first task reports `COMPLETE`.
//! Each attempt is awaited before the next tick is taken, so two attempts
//! for the same job are never in flight together.
//!
//! A failed attempt does not end the loop: the error is logged (and
//! reported as `requestError` / `responseError`) and polling carries on.
//! The loop only ends on the terminal status, on cancellation, or when the
//! optional consecutive-error budget runs out.

use std::time::Duration;

use serde_json::Value;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use apm_core::{IngestSettings, JobHandle, JobStatusReport, StatusEvent};

use crate::error::IngestError;
use crate::events::StatusEvents;
use crate::http::AlertsHttp;
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct StatusPoller {
    http: AlertsHttp,
    events: StatusEvents,
    interval: Duration,
    error_budget: Option<u32>,
}

impl StatusPoller {
    pub fn new(http: AlertsHttp, events: StatusEvents, settings: &IngestSettings) -> Self {
        Self {
            http,
            events,
            interval: settings.poll_interval(),
            error_budget: settings.poll_error_budget(),
        }
    }

    /// Poll until the job completes and return the full final status body.
    pub async fn poll(
        &self,
        session: &Session,
        job: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<Value, IngestError> {
        let url = session.config.status_url(&job.uuid);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the first poll waits a full period.
        ticker.tick().await;

        let mut attempt: u64 = 0;
        let mut consecutive_errors: u32 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(job, attempt)),
                _ = ticker.tick() => {}
            }

            attempt += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(job, attempt)),
                result = self.poll_once(session, &url) => result,
            };

            match result {
                Ok((body, report)) => {
                    consecutive_errors = 0;
                    if report.is_complete() {
                        info!(uuid = %job.uuid, attempt, "job complete");
                        self.events
                            .emit(StatusEvent::AlertsCreated, Some(job.uuid.clone()));
                        return Ok(body);
                    }
                    let state = report.state();
                    debug!(
                        uuid = %job.uuid,
                        attempt,
                        state = state.as_ref().map_or("<none>", |s| s.as_str()),
                        "job still running"
                    );
                }
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        uuid = %job.uuid,
                        attempt,
                        consecutive_errors,
                        error = %e,
                        "status poll failed, will retry on next tick"
                    );
                    if let Some(budget) = self.error_budget {
                        if consecutive_errors >= budget {
                            return Err(IngestError::PollErrorBudgetExceeded {
                                attempts: consecutive_errors,
                                last_error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    async fn poll_once(
        &self,
        session: &Session,
        url: &str,
    ) -> Result<(Value, JobStatusReport), IngestError> {
        let body = self.http.get_json(session, url).await?;
        match serde_json::from_value(body.clone()) {
            Ok(report) => Ok((body, report)),
            Err(e) => {
                let err = IngestError::Decode(format!("unexpected status body: {e}"));
                self.events.report(&err);
                Err(err)
            }
        }
    }

    fn cancelled(&self, job: &JobHandle, attempt: u64) -> IngestError {
        warn!(uuid = %job.uuid, attempt, "status polling cancelled");
        IngestError::Cancelled
    }
}
