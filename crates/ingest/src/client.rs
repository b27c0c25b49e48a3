//! Alert ingest client.
//!
//! Ties the sequence together: one token exchange at startup, then for each
//! inbound message validate, submit, and poll until the job completes.
//! Every failure is terminal for its submission only; the client stays
//! usable for the next input.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use apm_core::{
    ApmConfig, ConnectionConfig, IngestRequest, IngestSettings, InputMessage, OutputMessage,
    StatusTransition,
};

use crate::auth::Authenticator;
use crate::error::IngestError;
use crate::events::StatusEvents;
use crate::http::AlertsHttp;
use crate::poll::StatusPoller;
use crate::session::Session;
use crate::submit::AlertSubmitter;

pub struct IngestClient {
    config: Arc<ConnectionConfig>,
    events: StatusEvents,
    authenticator: Authenticator,
    submitter: AlertSubmitter,
    poller: StatusPoller,
    /// Set exactly once by [`IngestClient::start`]; the error string is kept
    /// when the token exchange failed.
    session: OnceCell<Result<Session, String>>,
    shutdown: CancellationToken,
}

impl IngestClient {
    /// Create an unauthenticated client. Call [`start`](Self::start) before
    /// sending input.
    pub fn new(config: ConnectionConfig, settings: &IngestSettings) -> Result<Self, IngestError> {
        let events = StatusEvents::new(settings.event_capacity);
        let http_client = AlertsHttp::build_client(settings.request_timeout())?;
        let http = AlertsHttp::new(http_client.clone(), events.clone());

        Ok(Self {
            config: Arc::new(config),
            authenticator: Authenticator::new(http_client, events.clone()),
            submitter: AlertSubmitter::new(http.clone(), events.clone()),
            poller: StatusPoller::new(http, events.clone(), settings),
            events,
            session: OnceCell::new(),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn from_config(config: &ApmConfig) -> Result<Self, IngestError> {
        Self::new(config.connection.clone(), &config.ingest)
    }

    /// Create a client and run the startup token exchange.
    ///
    /// A failed exchange is not an error here: the client is returned
    /// unauthenticated and drops every input.
    pub async fn connect(
        config: ConnectionConfig,
        settings: &IngestSettings,
    ) -> Result<Self, IngestError> {
        let client = Self::new(config, settings)?;
        if let Err(e) = client.start().await {
            warn!(error = %e, "ingest client is unauthenticated");
        }
        Ok(client)
    }

    /// Exchange credentials for a token. Only the first call reaches the
    /// token endpoint; later calls report the outcome of that first call.
    pub async fn start(&self) -> Result<(), IngestError> {
        let outcome = self
            .session
            .get_or_init(|| async move {
                self.authenticator
                    .authenticate(&self.config)
                    .await
                    .map(|token| Session::new(self.config.clone(), token))
                    .map_err(|e| match e {
                        IngestError::Authentication(reason) => reason,
                        other => other.to_string(),
                    })
            })
            .await;

        match outcome {
            Ok(_) => Ok(()),
            Err(reason) => Err(IngestError::Authentication(reason.clone())),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.session.get(), Some(Ok(_)))
    }

    /// Receive every status transition emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusTransition> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Cancel any in-flight submission and reject later input.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("ingest client shutting down");
            self.shutdown.cancel();
        }
    }

    /// Token that is cancelled by [`shutdown`](Self::shutdown).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run one submission to completion and return the final status body.
    pub async fn process(&self, input: InputMessage) -> Result<Value, IngestError> {
        let session = self.session()?;

        if self.shutdown.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        let request = IngestRequest::from_payload(input.payload).map_err(|reason| {
            let err = IngestError::BadPayload(reason);
            self.events.report(&err);
            err
        })?;

        let job = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(IngestError::Cancelled),
            job = self.submitter.submit(session, &request) => job?,
        };

        self.poller.poll(session, &job, &self.shutdown).await
    }

    /// Handle one host input event.
    ///
    /// Returns `None` when there is no access token: the input is dropped
    /// without output. Otherwise exactly one output message is produced,
    /// carrying either the final status body or the error.
    pub async fn handle_input(&self, input: InputMessage) -> Option<OutputMessage> {
        match self.process(input).await {
            Ok(payload) => Some(OutputMessage { payload }),
            Err(IngestError::NoAccessToken) => {
                warn!("no access token, dropping input");
                None
            }
            Err(e) => Some(OutputMessage {
                payload: e.to_payload(),
            }),
        }
    }

    /// Handle one input event given as raw JSON text.
    pub async fn handle_raw_input(&self, raw: &str) -> Option<OutputMessage> {
        match serde_json::from_str::<InputMessage>(raw) {
            Ok(input) => self.handle_input(input).await,
            Err(e) => {
                if !self.is_authenticated() {
                    warn!("no access token, dropping input");
                    return None;
                }
                let err = if self.shutdown.is_cancelled() {
                    IngestError::Cancelled
                } else {
                    IngestError::BadPayload(format!("input is not a valid message: {e}"))
                };
                self.events.report(&err);
                Some(OutputMessage {
                    payload: err.to_payload(),
                })
            }
        }
    }

    fn session(&self) -> Result<&Session, IngestError> {
        match self.session.get() {
            Some(Ok(session)) => Ok(session),
            _ => Err(IngestError::NoAccessToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offline_config() -> ConnectionConfig {
        ConnectionConfig {
            uaa_token_url: "http://127.0.0.1:9/oauth/token".into(),
            client_id: "ingestor".into(),
            client_secret: None,
            username: "user".into(),
            password: "pw".into(),
            ingestion_url: "http://127.0.0.1:9/v1/jobs".into(),
            tenant_id: "tenant-1".into(),
        }
    }

    #[tokio::test]
    async fn input_before_start_has_no_access_token() {
        let client = IngestClient::new(offline_config(), &IngestSettings::default()).unwrap();
        assert!(!client.is_authenticated());

        let err = client
            .process(InputMessage::new(json!({"taskList": ["t1"]})))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NoAccessToken));

        let output = client
            .handle_input(InputMessage::new(json!({"taskList": ["t1"]})))
            .await;
        assert!(output.is_none());
    }

    #[tokio::test]
    async fn raw_input_without_token_is_dropped() {
        let client = IngestClient::new(offline_config(), &IngestSettings::default()).unwrap();
        assert!(client.handle_raw_input("not json").await.is_none());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let client = IngestClient::new(offline_config(), &IngestSettings::default()).unwrap();
        let token = client.shutdown_token();
        client.shutdown();
        client.shutdown();
        assert!(token.is_cancelled());
    }
}
