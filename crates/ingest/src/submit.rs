use apm_core::{IngestRequest, JobHandle, StatusEvent};

use crate::error::IngestError;
use crate::events::StatusEvents;
use crate::http::AlertsHttp;
use crate::session::Session;

/// Posts validated payloads to the alerts jobs endpoint.
#[derive(Debug, Clone)]
pub struct AlertSubmitter {
    http: AlertsHttp,
    events: StatusEvents,
}

impl AlertSubmitter {
    pub fn new(http: AlertsHttp, events: StatusEvents) -> Self {
        Self { http, events }
    }

    /// Submit a payload and return the job handle from the response.
    ///
    /// Emits `sendingAlerts` before the request and `alertsStaged` once the
    /// service has accepted the job. Failures are not retried.
    pub async fn submit(
        &self,
        session: &Session,
        request: &IngestRequest,
    ) -> Result<JobHandle, IngestError> {
        self.events.emit(StatusEvent::SendingAlerts, None);

        let url = session.config.submit_url();
        tracing::debug!(url, tasks = request.task_count(), "submitting alerts");
        let body = self.http.post_json(session, url, request.body()).await?;

        let handle: JobHandle = match serde_json::from_value(body.clone()) {
            Ok(handle) => handle,
            Err(e) => {
                let err = IngestError::Decode(format!("submit response has no uuid: {e}: {body}"));
                self.events.report(&err);
                return Err(err);
            }
        };

        self.events
            .emit(StatusEvent::AlertsStaged, Some(handle.uuid.clone()));
        Ok(handle)
    }
}
