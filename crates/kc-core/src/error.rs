//! Error handling for the Keycloak event model.

use thiserror::Error;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while interpreting event model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A name does not match any known user event type.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// A name does not match any known admin operation type.
    #[error("unknown operation type: {0}")]
    UnknownOperationType(String),
}
