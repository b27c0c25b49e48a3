use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required config value: {0}")]
    Missing(&'static str),

    #[error("invalid URL for {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
