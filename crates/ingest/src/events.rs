//! Status transition channel.
//!
//! Every component reports its named conditions through a shared
//! [`StatusEvents`] handle. Transitions are logged and broadcast to any
//! number of subscribers; rendering them is up to the host.

use apm_core::{StatusEvent, StatusTransition};
use tokio::sync::broadcast;

use crate::error::IngestError;

#[derive(Debug, Clone)]
pub struct StatusEvents {
    tx: broadcast::Sender<StatusTransition>,
}

impl StatusEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every transition emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusTransition> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: StatusEvent, detail: Option<String>) {
        let detail_str = detail.as_deref().unwrap_or("");
        if event.is_error() {
            tracing::warn!(status = %event, detail = detail_str, "{}", event.label());
        } else {
            tracing::info!(status = %event, detail = detail_str, "{}", event.label());
        }

        // No subscribers is fine; the transition is still in the log.
        let _ = self.tx.send(StatusTransition::new(event, detail));
    }

    /// Emit the condition an error maps to, with the error as detail.
    /// Lifecycle errors that map to no condition are only returned.
    pub fn report(&self, err: &IngestError) {
        if let Some(event) = err.status_event() {
            self.emit(event, Some(err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_transitions_in_order() {
        let events = StatusEvents::new(8);
        let mut rx = events.subscribe();

        events.emit(StatusEvent::SendingAlerts, None);
        events.emit(StatusEvent::AlertsStaged, Some("abc".into()));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event, StatusEvent::SendingAlerts);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.event, StatusEvent::AlertsStaged);
        assert_eq!(second.detail.as_deref(), Some("abc"));
    }

    #[test]
    fn report_maps_errors_to_conditions() {
        let events = StatusEvents::new(8);
        let mut rx = events.subscribe();

        events.report(&IngestError::Decode("bad shape".into()));
        events.report(&IngestError::Cancelled);
        events.report(&IngestError::BadPayload("no taskList".into()));

        let first = rx.try_recv().unwrap();
        assert_eq!(first.event, StatusEvent::ResponseError);
        assert!(first.detail.unwrap().contains("bad shape"));
        assert_eq!(rx.try_recv().unwrap().event, StatusEvent::BadPayload);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let events = StatusEvents::new(0);
        events.emit(StatusEvent::Authenticated, None);
    }
}
