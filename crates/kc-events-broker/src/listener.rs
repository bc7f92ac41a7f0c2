//! Event listener provider and factory.
//!
//! The factory is registered with the host under [`PROVIDER_ID`]. Its
//! configuration scope accepts `excludes` (comma-separated user event kinds
//! that are not forwarded) plus the relay keys listed in
//! [`ConfigKey`](crate::config::ConfigKey).

use std::sync::Arc;

use async_trait::async_trait;
use kc_core::{AdminEvent, UserEvent};
use kc_spi::{
    EventListenerProvider, FactoryConfig, Provider, ProviderFactory, ProviderMetadata, SpiError,
    EVENT_LISTENER_SPI,
};

use crate::broker::redis::RedisBroker;
use crate::broker::MessageBroker;
use crate::config::RelayConfig;
use crate::filter::{EventFilter, ExclusionSet};
use crate::relay::EventRelay;

/// Identifier of the listener in the host's configuration.
pub const PROVIDER_ID: &str = "jms";

/// Scope key listing the excluded user event kinds.
pub const EXCLUDES: &str = "excludes";

/// Forwards host events to the broker.
#[derive(Debug, Clone)]
pub struct BrokerEventListenerProvider {
    filter: EventFilter,
    relay: Arc<EventRelay>,
}

impl BrokerEventListenerProvider {
    /// Creates a provider.
    #[must_use]
    pub const fn new(filter: EventFilter, relay: Arc<EventRelay>) -> Self {
        Self { filter, relay }
    }

    /// Returns the relay.
    #[must_use]
    pub const fn relay(&self) -> &Arc<EventRelay> {
        &self.relay
    }
}

// The relay belongs to the factory; closing a provider releases nothing.
impl Provider for BrokerEventListenerProvider {}

#[async_trait]
impl EventListenerProvider for BrokerEventListenerProvider {
    async fn on_event(&self, event: &UserEvent) {
        if !self.filter.accepts(event) {
            tracing::trace!(event_type = %event.event_type, "event excluded");
            return;
        }
        self.relay.publish(event).await;
    }

    async fn on_admin_event(&self, event: &AdminEvent, include_representation: bool) {
        if !include_representation && event.representation.is_some() {
            self.relay.publish(&event.without_representation()).await;
        } else {
            self.relay.publish(event).await;
        }
    }
}

/// Creates [`BrokerEventListenerProvider`]s sharing one relay.
#[derive(Debug, Default)]
pub struct BrokerEventListenerProviderFactory {
    base_config: RelayConfig,
    broker: Option<Arc<dyn MessageBroker>>,
    relay_config: Option<RelayConfig>,
    exclusions: Option<Arc<ExclusionSet>>,
    relay: Option<Arc<EventRelay>>,
}

impl BrokerEventListenerProviderFactory {
    /// Creates a factory with default relay settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory whose scope keys apply over `config`.
    #[must_use]
    pub fn with_config(config: RelayConfig) -> Self {
        Self {
            base_config: config,
            ..Self::default()
        }
    }

    /// Uses the given broker instead of a [`RedisBroker`] built from the
    /// configuration.
    #[must_use]
    pub fn broker(mut self, broker: Arc<dyn MessageBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Returns the excluded user event kinds, once initialized.
    #[must_use]
    pub fn exclusions(&self) -> Option<&ExclusionSet> {
        self.exclusions.as_deref()
    }

    /// Returns the relay, once post-initialized.
    #[must_use]
    pub const fn relay(&self) -> Option<&Arc<EventRelay>> {
        self.relay.as_ref()
    }
}

#[async_trait]
impl ProviderFactory<BrokerEventListenerProvider> for BrokerEventListenerProviderFactory {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            id: PROVIDER_ID,
            name: "Message broker event listener",
            description: "Forwards user and admin events to a message broker",
            spi: EVENT_LISTENER_SPI,
        }
    }

    async fn init(&mut self, config: &dyn FactoryConfig) -> Result<(), SpiError> {
        let exclusions = config
            .get_array(EXCLUDES)
            .map(ExclusionSet::parse)
            .transpose()
            .map_err(|e| SpiError::Configuration(format!("{EXCLUDES}: {e}")))?;

        let relay_config = self
            .base_config
            .clone()
            .overlay_scope(config)
            .map_err(|e| SpiError::Configuration(e.to_string()))?;

        tracing::debug!(
            excluded = exclusions.as_ref().map_or(0, ExclusionSet::len),
            format = %relay_config.format,
            "event listener configured"
        );

        self.exclusions = exclusions.map(Arc::new);
        self.relay_config = Some(relay_config);
        Ok(())
    }

    async fn post_init(&mut self) -> Result<(), SpiError> {
        let config = self
            .relay_config
            .clone()
            .ok_or_else(|| SpiError::InitializationFailed("factory not initialized".to_string()))?;

        let broker: Arc<dyn MessageBroker> = match &self.broker {
            Some(broker) => Arc::clone(broker),
            None => Arc::new(
                RedisBroker::new(config.clone())
                    .map_err(|e| SpiError::InitializationFailed(e.to_string()))?,
            ),
        };

        let relay = EventRelay::new(broker, &config)
            .map_err(|e| SpiError::InitializationFailed(e.to_string()))?;
        self.relay = Some(Arc::new(relay));
        Ok(())
    }

    async fn create(&self) -> Result<BrokerEventListenerProvider, SpiError> {
        let relay = self
            .relay
            .as_ref()
            .ok_or_else(|| SpiError::CreationFailed("relay not initialized".to_string()))?;

        Ok(BrokerEventListenerProvider::new(
            EventFilter::new(self.exclusions.clone()),
            Arc::clone(relay),
        ))
    }

    fn close(&mut self) {
        if let Some(relay) = self.relay.take() {
            relay.close();
        }
    }
}
