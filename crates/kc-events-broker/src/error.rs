//! Error types for the event relay.
//!
//! Configuration errors are fatal and surface at startup. Every other
//! variant is a transient publish error that the relay logs and drops.

use std::time::Duration;

use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors raised by the relay and its broker transports.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Invalid configuration or unresolvable destination.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connecting to the broker or opening a session failed.
    #[error("broker connection error: {0}")]
    Connection(String),

    /// The broker rejected or failed to accept a message.
    #[error("send failed: {0}")]
    Send(String),

    /// The event could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Opening the session and sending did not finish in time.
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    /// The relay has been shut down.
    #[error("relay is closed")]
    Closed,
}

impl RelayError {
    /// Returns whether this error must stop the plugin from starting.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Converts a `fred` Redis error to a `RelayError`.
#[allow(clippy::needless_pass_by_value)]
pub fn from_redis_error(err: fred::error::Error) -> RelayError {
    match err.kind() {
        fred::error::ErrorKind::IO
        | fred::error::ErrorKind::Timeout
        | fred::error::ErrorKind::Auth => RelayError::Connection(err.to_string()),
        fred::error::ErrorKind::Config | fred::error::ErrorKind::Url => {
            RelayError::Configuration(err.to_string())
        }
        _ => RelayError::Send(err.to_string()),
    }
}
