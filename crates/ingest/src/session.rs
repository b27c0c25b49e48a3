use std::sync::Arc;

use apm_core::{ConnectionConfig, SessionToken};

/// An authenticated connection: the config it was made with plus its token.
///
/// Passed by reference into every submit and poll call. The token is never
/// refreshed, so a session is immutable for its whole life.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Arc<ConnectionConfig>,
    pub token: SessionToken,
}

impl Session {
    pub fn new(config: Arc<ConnectionConfig>, token: SessionToken) -> Self {
        Self { config, token }
    }
}
