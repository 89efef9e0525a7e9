//! Configuration error types.

use thiserror::Error;

/// Result type alias for config loading and validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating a simulation config.
///
/// These are the only failures that surface to the caller; they are
/// always reported before any worker unit is spawned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: 'servers' must be a non-empty list")]
    NoServers,

    #[error("invalid config: 'requests' must be a non-empty list")]
    NoRequests,
}
