pub mod config;
pub mod error;
pub mod model;
pub mod status;

pub use config::{load_dotenv, ApmConfig, ConnectionConfig, IngestSettings};
pub use error::*;
pub use model::*;
pub use status::{StatusEvent, StatusTransition};
