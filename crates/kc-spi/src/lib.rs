//! # kc-spi
//!
//! Service Provider Interface (SPI) traits for Keycloak event listeners.
//!
//! The host owns the plugin lifecycle and dispatches events; this crate
//! defines the contract between the two:
//! - [`Provider`] - Base trait for all provider implementations
//! - [`EventListenerProvider`] - Receives user and admin events
//! - [`ProviderFactory`] - Creates provider instances, configured once at startup
//! - [`FactoryConfig`] - The configuration scope a factory is initialized with

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod provider;

pub use config::{FactoryConfig, MapConfig};
pub use provider::{
    EventListenerProvider, Provider, ProviderFactory, ProviderMetadata, SpiError,
    EVENT_LISTENER_SPI,
};
