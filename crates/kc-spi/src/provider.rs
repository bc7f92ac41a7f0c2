//! Listener and factory contracts.

use std::fmt::Debug;

use async_trait::async_trait;
use kc_core::{AdminEvent, UserEvent};
use thiserror::Error;

use crate::config::FactoryConfig;

/// Name of the host extension point event listeners register under.
pub const EVENT_LISTENER_SPI: &str = "eventsListener";

/// Errors reported to the host by a factory.
#[derive(Debug, Error)]
pub enum SpiError {
    /// The factory could not finish starting up.
    #[error("listener initialization failed: {0}")]
    InitializationFailed(String),

    /// A listener instance could not be handed out.
    #[error("listener creation failed: {0}")]
    CreationFailed(String),

    /// The configuration scope holds an invalid value.
    #[error("invalid listener configuration: {0}")]
    Configuration(String),
}

/// Something the host creates through a [`ProviderFactory`] and closes when
/// it is done with it.
pub trait Provider: Send + Sync + Debug {
    /// Releases per-instance resources. Does nothing by default.
    fn close(&self) {}
}

/// A provider that receives the host's events.
///
/// The host awaits each call on the task that produced the event. A listener
/// must not fail the action that generated the event, so neither method
/// returns an error.
#[async_trait]
pub trait EventListenerProvider: Provider {
    /// Called for every user event.
    async fn on_event(&self, event: &UserEvent);

    /// Called for every admin event.
    ///
    /// `include_representation` tells whether the host was configured to
    /// expose the resource representation to listeners.
    async fn on_admin_event(&self, event: &AdminEvent, include_representation: bool);
}

/// Descriptive information shown by the host.
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    /// Identifier used in the host configuration.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// One-line summary.
    pub description: &'static str,
    /// Extension point the provider plugs into (e.g. [`EVENT_LISTENER_SPI`]).
    pub spi: &'static str,
}

/// Creates listener instances.
///
/// The host keeps one factory per deployment. Whatever the instances share
/// (connections, parsed configuration) lives here. The host calls, in order:
/// [`init`](Self::init) once with the factory's configuration scope,
/// [`post_init`](Self::post_init) once every factory is initialized,
/// [`create`](Self::create) any number of times, then [`close`](Self::close)
/// at shutdown.
#[async_trait]
pub trait ProviderFactory<P: Provider>: Send + Sync + Debug {
    /// Identifier used in the host configuration.
    fn id(&self) -> &'static str;

    /// Descriptive information about the listener.
    fn metadata(&self) -> ProviderMetadata;

    /// Reads the configuration scope.
    ///
    /// ## Errors
    ///
    /// Returns [`SpiError::Configuration`] if a value is invalid.
    async fn init(&mut self, config: &dyn FactoryConfig) -> Result<(), SpiError>;

    /// Acquires shared resources.
    ///
    /// ## Errors
    ///
    /// Returns [`SpiError::InitializationFailed`] if they cannot be set up.
    async fn post_init(&mut self) -> Result<(), SpiError> {
        Ok(())
    }

    /// Hands out a listener instance.
    ///
    /// ## Errors
    ///
    /// Returns [`SpiError::CreationFailed`] if the factory is not ready.
    async fn create(&self) -> Result<P, SpiError>;

    /// Releases shared resources.
    fn close(&mut self) {}
}
