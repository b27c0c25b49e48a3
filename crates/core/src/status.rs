//! Named status conditions reported to the host while a submission runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed vocabulary of conditions the ingest client reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusEvent {
    Authenticated,
    Unauthenticated,
    BadPayload,
    RequestError,
    SendingAlerts,
    AlertsStaged,
    AlertsCreated,
    ResponseError,
}

impl StatusEvent {
    pub const ALL: [StatusEvent; 8] = [
        StatusEvent::Authenticated,
        StatusEvent::Unauthenticated,
        StatusEvent::BadPayload,
        StatusEvent::RequestError,
        StatusEvent::SendingAlerts,
        StatusEvent::AlertsStaged,
        StatusEvent::AlertsCreated,
        StatusEvent::ResponseError,
    ];

    /// Wire name, e.g. `alertsStaged`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusEvent::Authenticated => "authenticated",
            StatusEvent::Unauthenticated => "unauthenticated",
            StatusEvent::BadPayload => "badPayload",
            StatusEvent::RequestError => "requestError",
            StatusEvent::SendingAlerts => "sendingAlerts",
            StatusEvent::AlertsStaged => "alertsStaged",
            StatusEvent::AlertsCreated => "alertsCreated",
            StatusEvent::ResponseError => "responseError",
        }
    }

    /// Short human-readable label for status displays.
    pub fn label(&self) -> &'static str {
        match self {
            StatusEvent::Authenticated => "Authenticated",
            StatusEvent::Unauthenticated => "Unauthenticated",
            StatusEvent::BadPayload => "Bad Payload",
            StatusEvent::RequestError => "Request Error",
            StatusEvent::SendingAlerts => "Sending Alerts",
            StatusEvent::AlertsStaged => "Alerts Staged",
            StatusEvent::AlertsCreated => "Alerts Created",
            StatusEvent::ResponseError => "Response Error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StatusEvent::Unauthenticated
                | StatusEvent::BadPayload
                | StatusEvent::RequestError
                | StatusEvent::ResponseError
        )
    }
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observed status change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusTransition {
    pub event: StatusEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl StatusTransition {
    pub fn new(event: StatusEvent, detail: Option<String>) -> Self {
        Self {
            event,
            detail,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names_match_wire_names() {
        for event in StatusEvent::ALL {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event.as_str()));
        }
    }

    #[test]
    fn error_conditions() {
        let errors: Vec<_> = StatusEvent::ALL.iter().filter(|e| e.is_error()).collect();
        assert_eq!(errors.len(), 4);
        assert!(!StatusEvent::AlertsStaged.is_error());
    }

    #[test]
    fn transition_omits_empty_detail() {
        let t = StatusTransition::new(StatusEvent::SendingAlerts, None);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["event"], "sendingAlerts");
        assert!(json.get("detail").is_none());
    }
}
