//! Client for the APM alerts ingestion API.
//!
//! This crate provides:
//! - `Authenticator` for the UAA password-grant token exchange
//! - `AlertSubmitter` for posting task lists to the jobs endpoint
//! - `StatusPoller` for waiting on a job until it reports `COMPLETE`
//! - `IngestClient` that runs the whole sequence per input message
//! - `StatusEvents`, the subscription point for status transitions

pub mod auth;
pub mod client;
pub mod error;
pub mod events;
pub mod http;
pub mod poll;
pub mod session;
pub mod submit;

pub use auth::Authenticator;
pub use client::IngestClient;
pub use error::IngestError;
pub use events::StatusEvents;
pub use http::AlertsHttp;
pub use poll::StatusPoller;
pub use session::Session;
pub use submit::AlertSubmitter;
