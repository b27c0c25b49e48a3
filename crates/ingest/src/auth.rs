//! UAA token exchange.
//!
//! Uses a password grant: the client ID is the basic-auth principal and the
//! UAA user's credentials travel as form fields. There is no retry and no
//! refresh; a failed exchange leaves the caller unauthenticated.

use serde::Deserialize;

use apm_core::{ConnectionConfig, SessionToken, StatusEvent};

use crate::error::IngestError;
use crate::events::StatusEvents;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Authenticator {
    client: reqwest::Client,
    events: StatusEvents,
}

impl Authenticator {
    pub fn new(client: reqwest::Client, events: StatusEvents) -> Self {
        Self { client, events }
    }

    /// Exchange the configured credentials for a bearer token.
    ///
    /// Emits `authenticated` on success, `unauthenticated` otherwise.
    pub async fn authenticate(
        &self,
        config: &ConnectionConfig,
    ) -> Result<SessionToken, IngestError> {
        match self.exchange(config).await {
            Ok(token) => {
                tracing::info!(url = %config.uaa_token_url, "obtained access token");
                self.events.emit(StatusEvent::Authenticated, None);
                Ok(token)
            }
            Err(e) => {
                self.events.report(&e);
                Err(e)
            }
        }
    }

    async fn exchange(&self, config: &ConnectionConfig) -> Result<SessionToken, IngestError> {
        let form = [
            ("grant_type", "password"),
            ("username", config.username.as_str()),
            ("password", config.password.as_str()),
        ];

        let response = self
            .client
            .post(&config.uaa_token_url)
            .basic_auth(&config.client_id, Some(config.client_secret.as_deref().unwrap_or("")))
            .form(&form)
            .send()
            .await
            .map_err(|e| IngestError::Authentication(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Authentication(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| IngestError::Authentication(format!("invalid token response: {e}")))?;

        match parsed.access_token {
            Some(token) if !token.is_empty() => Ok(SessionToken::new(token)),
            _ => Err(IngestError::Authentication(
                "token response has no access_token".to_string(),
            )),
        }
    }
}
