use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_default()
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApmConfig {
    /// Active profile name (empty = default).
    #[serde(default)]
    pub profile: String,
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub ingest: IngestSettings,
}

impl ApmConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `APM_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("APM_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            connection: ConnectionConfig::from_env_profiled(p),
            ingest: IngestSettings::from_env_profiled(p),
        }
    }

    /// Load config from a TOML file with `[connection]` and `[ingest]` tables.
    ///
    /// Ingest settings missing from the file keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  uaa:         url={}, client_id={}", self.connection.uaa_token_url, self.connection.client_id);
        tracing::info!("  ingestion:   url={}, tenant={}", self.connection.ingestion_url, self.connection.tenant_id);
        tracing::info!(
            "  ingest:      poll_interval_ms={}, max_poll_errors={}, request_timeout_secs={}",
            self.ingest.poll_interval_ms,
            self.ingest.max_consecutive_poll_errors,
            self.ingest.request_timeout_secs
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "connection": {
                "uaa_token_url": self.connection.uaa_token_url,
                "client_id": self.connection.client_id,
                "username": self.connection.username,
                "ingestion_url": self.connection.ingestion_url,
                "tenant_id": self.connection.tenant_id,
                "has_client_secret": self.connection.client_secret.is_some(),
            },
            "ingest": {
                "poll_interval_ms": self.ingest.poll_interval_ms,
                "max_consecutive_poll_errors": self.ingest.max_consecutive_poll_errors,
                "request_timeout_secs": self.ingest.request_timeout_secs,
                "event_capacity": self.ingest.event_capacity,
            },
        })
    }
}

// ── Connection ────────────────────────────────────────────────

/// Credentials and endpoints for the UAA token service and the alerts API.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub uaa_token_url: String,
    pub client_id: String,
    /// Basic-auth password paired with `client_id`; sent empty when unset.
    #[serde(default)]
    pub client_secret: Option<String>,
    pub username: String,
    pub password: String,
    /// Jobs endpoint, e.g. `https://apm-gateway.example.com/v1/jobs`.
    pub ingestion_url: String,
    pub tenant_id: String,
}

impl ConnectionConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            uaa_token_url: profiled_env_or(p, "APM_UAA_TOKEN_URL"),
            client_id: profiled_env_or(p, "APM_CLIENT_ID"),
            client_secret: profiled_env_opt(p, "APM_CLIENT_SECRET"),
            username: profiled_env_or(p, "APM_USERNAME"),
            password: profiled_env_or(p, "APM_PASSWORD"),
            ingestion_url: profiled_env_or(p, "APM_INGESTION_URL"),
            tenant_id: profiled_env_or(p, "APM_TENANT_ID"),
        }
    }

    /// Check that every required value is present and both URLs are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("uaa_token_url", &self.uaa_token_url),
            ("client_id", &self.client_id),
            ("username", &self.username),
            ("password", &self.password),
            ("ingestion_url", &self.ingestion_url),
            ("tenant_id", &self.tenant_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }

        check_http_url("uaa_token_url", &self.uaa_token_url)?;
        check_http_url("ingestion_url", &self.ingestion_url)?;
        Ok(())
    }

    /// URL that jobs are submitted to.
    pub fn submit_url(&self) -> &str {
        self.ingestion_url.trim_end_matches('/')
    }

    /// Status URL for a submitted job: `{ingestion_url}/{uuid}/status`.
    pub fn status_url(&self, uuid: &str) -> String {
        format!("{}/{}/status", self.submit_url(), uuid)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("uaa_token_url", &self.uaa_token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ingestion_url", &self.ingestion_url)
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

fn check_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

// ── Ingest ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestSettings {
    /// Delay between job status polls.
    pub poll_interval_ms: u64,
    /// Consecutive failed polls that end the loop (0 = unlimited).
    pub max_consecutive_poll_errors: u32,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Buffer size of the status transition channel.
    pub event_capacity: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            max_consecutive_poll_errors: 0,
            request_timeout_secs: 30,
            event_capacity: 64,
        }
    }
}

impl IngestSettings {
    fn from_env_profiled(p: &str) -> Self {
        let defaults = Self::default();
        Self {
            poll_interval_ms: profiled_env_u64(p, "APM_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            max_consecutive_poll_errors: profiled_env_u32(
                p,
                "APM_MAX_POLL_ERRORS",
                defaults.max_consecutive_poll_errors,
            ),
            request_timeout_secs: profiled_env_u64(
                p,
                "APM_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            ),
            event_capacity: profiled_env_u64(p, "APM_EVENT_CAPACITY", defaults.event_capacity as u64)
                as usize,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero period would make `tokio::time::interval` panic.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The error budget as an option: `None` means poll errors never end the loop.
    pub fn poll_error_budget(&self) -> Option<u32> {
        (self.max_consecutive_poll_errors > 0).then_some(self.max_consecutive_poll_errors)
    }
}
