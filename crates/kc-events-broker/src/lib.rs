//! # kc-events-broker
//!
//! Keycloak event listener that forwards user and admin events to a message
//! broker.
//!
//! The listener is a thin adapter between the host's event callbacks and a
//! messaging client:
//!
//! ```text
//! host -> EventFilter -> EventRelay -> MessageBroker -> broker
//! ```
//!
//! - [`EventFilter`] drops user events whose kind is configured in `excludes`
//! - [`EventRelay`] shapes accepted events into an [`OutboundMessage`] and
//!   publishes them on a transient broker session
//! - [`MessageBroker`] is the transport seam: [`RedisBroker`] writes to Redis
//!   streams, [`InMemoryBroker`] keeps messages in memory
//!
//! Publishing is best effort. A failed publish is logged once at `WARN` and
//! dropped; the host never sees the failure.
//!
//! ## Example
//!
//! ```ignore
//! use kc_events_broker::{BrokerEventListenerProviderFactory, RelayConfig};
//! use kc_spi::{MapConfig, ProviderFactory};
//!
//! let mut factory = BrokerEventListenerProviderFactory::with_config(RelayConfig::from_env()?);
//! factory.init(&MapConfig::new().with("excludes", "REFRESH_TOKEN,CODE_TO_TOKEN")).await?;
//! factory.post_init().await?;
//!
//! let listener = factory.create().await?;
//! listener.on_event(&event).await;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod broker;
pub mod config;
pub mod error;
pub mod filter;
pub mod listener;
pub mod message;
pub mod relay;

pub use broker::memory::{InMemoryBroker, SentMessage};
pub use broker::redis::RedisBroker;
pub use broker::{BrokerSession, Destination, MessageBroker};
pub use config::{ConfigKey, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use filter::{EventFilter, ExclusionSet};
pub use listener::{BrokerEventListenerProvider, BrokerEventListenerProviderFactory, PROVIDER_ID};
pub use message::{EventCategory, MessageFormat, OutboundMessage, Publishable};
pub use relay::{EventRelay, PublishOutcome};
