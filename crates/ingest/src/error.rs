//! Errors for the token / submit / poll sequence.

use apm_core::StatusEvent;
use serde_json::{json, Value};

/// Errors that end a submission (or, for authentication, the client's session).
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The token exchange failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The inbound payload has no usable task list.
    #[error("bad payload: {0}")]
    BadPayload(String),

    /// Transport-level failure: DNS, connect, timeout, reset.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The alerts service answered with a non-2xx status.
    #[error("alerts service returned {status}: {body}")]
    Response { status: u16, body: String },

    /// A 2xx body did not have the expected shape.
    #[error("failed to parse response: {0}")]
    Decode(String),

    #[error("no access token")]
    NoAccessToken,

    #[error("submission cancelled by shutdown")]
    Cancelled,

    #[error("status polling gave up after {attempts} consecutive errors: {last_error}")]
    PollErrorBudgetExceeded { attempts: u32, last_error: String },
}

impl IngestError {
    /// The named condition this error is reported as, if any.
    pub fn status_event(&self) -> Option<StatusEvent> {
        match self {
            IngestError::Authentication(_) => Some(StatusEvent::Unauthenticated),
            IngestError::BadPayload(_) => Some(StatusEvent::BadPayload),
            IngestError::Request(_) => Some(StatusEvent::RequestError),
            IngestError::Response { .. } => Some(StatusEvent::ResponseError),
            IngestError::Decode(_) => Some(StatusEvent::ResponseError),
            IngestError::NoAccessToken
            | IngestError::Cancelled
            | IngestError::PollErrorBudgetExceeded { .. } => None,
        }
    }

    /// Short machine-readable kind used in output payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Authentication(_) => "authenticationError",
            IngestError::BadPayload(_) => "badPayload",
            IngestError::Request(_) => "requestError",
            IngestError::Response { .. } => "responseError",
            IngestError::Decode(_) => "decodeError",
            IngestError::NoAccessToken => "noAccessToken",
            IngestError::Cancelled => "cancelled",
            IngestError::PollErrorBudgetExceeded { .. } => "pollErrorBudgetExceeded",
        }
    }

    /// Render the error as the payload of an output message.
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let IngestError::Response { status, body } = self {
            payload["status"] = json!(status);
            payload["body"] = json!(body);
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_error_payload_carries_status_and_body() {
        let err = IngestError::Response {
            status: 500,
            body: "boom".into(),
        };
        let payload = err.to_payload();
        assert_eq!(payload["error"], "responseError");
        assert_eq!(payload["status"], 500);
        assert_eq!(payload["body"], "boom");
        assert_eq!(err.status_event(), Some(StatusEvent::ResponseError));
    }

    #[test]
    fn lifecycle_errors_have_no_status_event() {
        assert_eq!(IngestError::NoAccessToken.status_event(), None);
        assert_eq!(IngestError::Cancelled.status_event(), None);
        assert_eq!(IngestError::NoAccessToken.to_string(), "no access token");
    }

    #[test]
    fn budget_error_message() {
        let err = IngestError::PollErrorBudgetExceeded {
            attempts: 3,
            last_error: "alerts service returned 401: expired".into(),
        };
        assert!(err.to_string().contains("3 consecutive"));
        assert_eq!(err.to_payload()["error"], "pollErrorBudgetExceeded");
    }
}
