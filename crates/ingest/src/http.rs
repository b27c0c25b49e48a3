//! Shared HTTP plumbing for calls to the alerts service.
//!
//! Both the submit and the status endpoint take the same bearer token and
//! `tenant` header and classify failures the same way. Transport failures
//! are reported as `requestError`, non-2xx answers as `responseError`.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::error::IngestError;
use crate::events::StatusEvents;
use crate::session::Session;

/// Tenant header attached to every alerts call.
pub const TENANT_HEADER: &str = "tenant";

#[derive(Debug, Clone)]
pub struct AlertsHttp {
    client: reqwest::Client,
    events: StatusEvents,
}

impl AlertsHttp {
    pub fn new(client: reqwest::Client, events: StatusEvents) -> Self {
        Self { client, events }
    }

    /// Build the shared HTTP client with a per-request timeout.
    pub fn build_client(timeout: Duration) -> Result<reqwest::Client, IngestError> {
        Ok(reqwest::Client::builder().timeout(timeout).build()?)
    }

    /// POST a JSON body to `url` with the session's credentials.
    pub async fn post_json(
        &self,
        session: &Session,
        url: &str,
        body: &Value,
    ) -> Result<Value, IngestError> {
        let request = self
            .authorized(self.client.post(url), session)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.execute(url, request).await
    }

    /// GET `url` with the session's credentials.
    pub async fn get_json(&self, session: &Session, url: &str) -> Result<Value, IngestError> {
        let request = self.authorized(self.client.get(url), session);
        self.execute(url, request).await
    }

    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        session: &Session,
    ) -> reqwest::RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", session.token.access_token))
            .header(TENANT_HEADER, session.config.tenant_id.as_str())
    }

    async fn execute(
        &self,
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, IngestError> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.fail(IngestError::Request(e))),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(url, %status, body = %body, "alerts service returned non-2xx status");
            return Err(self.fail(IngestError::Response {
                status: status.as_u16(),
                body,
            }));
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(IngestError::Request(e))),
        };
        serde_json::from_str(&text).map_err(|e| {
            self.fail(IngestError::Decode(format!(
                "invalid JSON body from {url} ({status}): {e}"
            )))
        })
    }

    fn fail(&self, err: IngestError) -> IngestError {
        self.events.report(&err);
        err
    }
}
