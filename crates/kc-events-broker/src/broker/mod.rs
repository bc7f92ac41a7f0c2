//! Broker transport abstraction.
//!
//! A [`MessageBroker`] plays the role of a connection factory: it resolves
//! destination names once at startup and opens a short-lived
//! [`BrokerSession`] for every publish.
//!
//! Implementations must allow concurrent `open_session` calls from a shared
//! reference; the relay does not serialize publishes.

pub mod memory;
pub mod redis;

use std::fmt;

use async_trait::async_trait;

use crate::error::{RelayError, RelayResult};
use crate::message::OutboundMessage;

/// A resolved messaging endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    name: String,
    address: String,
}

impl Destination {
    /// Creates a destination from its logical name and broker address.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Logical name, as configured.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Broker-specific address (e.g. a stream key).
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Connection factory for a message broker.
#[async_trait]
pub trait MessageBroker: Send + Sync + fmt::Debug {
    /// Resolves a logical destination name.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if the destination does not exist or
    /// the name is not usable.
    fn resolve(&self, name: &str) -> RelayResult<Destination>;

    /// Opens a session for one publish.
    ///
    /// ## Errors
    ///
    /// Returns a connection error if the broker cannot be reached.
    async fn open_session(&self) -> RelayResult<Box<dyn BrokerSession>>;
}

/// A short-lived session able to send messages.
#[async_trait]
pub trait BrokerSession: Send {
    /// Sends one message.
    ///
    /// ## Errors
    ///
    /// Returns an error if the broker did not accept the message.
    async fn send(&mut self, destination: &Destination, message: &OutboundMessage) -> RelayResult<()>;

    /// Releases the session. Called once, whether or not `send` succeeded.
    ///
    /// ## Errors
    ///
    /// Returns an error if the session could not be closed cleanly.
    async fn close(&mut self) -> RelayResult<()>;
}

pub(crate) fn validate_destination_name(name: &str) -> RelayResult<()> {
    if name.trim().is_empty() {
        return Err(RelayError::Configuration(
            "destination name is empty".to_string(),
        ));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(RelayError::Configuration(format!(
            "destination name contains whitespace: {name:?}"
        )));
    }
    Ok(())
}
