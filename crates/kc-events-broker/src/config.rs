//! Relay configuration.
//!
//! Values come from, in increasing priority: defaults, environment variables
//! (see [`RelayConfig::from_env`]) and the listener's configuration scope
//! (see [`RelayConfig::overlay_scope`]).

use std::time::Duration;

use kc_spi::FactoryConfig;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};
use crate::message::MessageFormat;

/// A relay setting, with its environment variable and scope key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    /// Broker connection URL.
    BrokerUrl,
    /// Destination of user events.
    EventsDestination,
    /// Destination of admin events.
    AdminEventsDestination,
    /// Message format.
    MessageFormat,
    /// Publish timeout in milliseconds.
    SendTimeoutMs,
    /// Prefix of broker keys.
    KeyPrefix,
    /// Approximate maximum stream length.
    StreamMaxLen,
}

impl ConfigKey {
    /// All keys.
    pub const ALL: &'static [Self] = &[
        Self::BrokerUrl,
        Self::EventsDestination,
        Self::AdminEventsDestination,
        Self::MessageFormat,
        Self::SendTimeoutMs,
        Self::KeyPrefix,
        Self::StreamMaxLen,
    ];

    /// Environment variable name.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::BrokerUrl => "KC_EVENTS_BROKER_URL",
            Self::EventsDestination => "KC_EVENTS_DESTINATION",
            Self::AdminEventsDestination => "KC_ADMIN_EVENTS_DESTINATION",
            Self::MessageFormat => "KC_EVENTS_MESSAGE_FORMAT",
            Self::SendTimeoutMs => "KC_EVENTS_SEND_TIMEOUT_MS",
            Self::KeyPrefix => "KC_EVENTS_KEY_PREFIX",
            Self::StreamMaxLen => "KC_EVENTS_STREAM_MAX_LEN",
        }
    }

    /// Key in the listener's configuration scope.
    #[must_use]
    pub const fn scope_key(self) -> &'static str {
        match self {
            Self::BrokerUrl => "brokerUrl",
            Self::EventsDestination => "eventsDestination",
            Self::AdminEventsDestination => "adminEventsDestination",
            Self::MessageFormat => "messageFormat",
            Self::SendTimeoutMs => "sendTimeoutMs",
            Self::KeyPrefix => "keyPrefix",
            Self::StreamMaxLen => "streamMaxLen",
        }
    }
}

/// Relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Broker connection URL (e.g. `redis://localhost:6379/0`).
    #[serde(default = "default_broker_url")]
    pub broker_url: String,
    /// Logical destination of user events.
    #[serde(default = "default_events_destination")]
    pub events_destination: String,
    /// Logical destination of admin events. `None` sends admin events to
    /// the user event destination.
    #[serde(default = "default_admin_events_destination")]
    pub admin_events_destination: Option<String>,
    /// Message format.
    #[serde(default)]
    pub format: MessageFormat,
    /// Upper bound for opening a session and sending one message.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
    /// Prefix of broker keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Approximate maximum length of each stream. Unbounded when `None`.
    #[serde(default)]
    pub max_len: Option<u64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            broker_url: default_broker_url(),
            events_destination: default_events_destination(),
            admin_events_destination: default_admin_events_destination(),
            format: MessageFormat::default(),
            send_timeout_ms: default_send_timeout(),
            key_prefix: default_key_prefix(),
            max_len: None,
        }
    }
}

impl RelayConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from environment variables over the defaults.
    ///
    /// A `.env` file is read if present.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if a variable holds an invalid value.
    pub fn from_env() -> RelayResult<Self> {
        let _ = dotenvy::dotenv();
        Self::default().overlay(|key| std::env::var(key.env_var()).ok())
    }

    /// Applies the keys present in a listener configuration scope.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if a key holds an invalid value.
    pub fn overlay_scope(self, scope: &dyn FactoryConfig) -> RelayResult<Self> {
        self.overlay(|key| scope.get(key.scope_key()).map(String::from))
    }

    /// Applies the values returned by `lookup`; keys it returns `None` for
    /// keep their current value.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if a value is invalid.
    pub fn overlay(mut self, lookup: impl Fn(ConfigKey) -> Option<String>) -> RelayResult<Self> {
        for key in ConfigKey::ALL {
            let Some(value) = lookup(*key) else {
                continue;
            };
            let value = value.trim();
            match key {
                ConfigKey::BrokerUrl => self.broker_url = value.to_string(),
                ConfigKey::EventsDestination => self.events_destination = value.to_string(),
                ConfigKey::AdminEventsDestination => {
                    self.admin_events_destination =
                        (!value.is_empty()).then(|| value.to_string());
                }
                ConfigKey::MessageFormat => self.format = value.parse()?,
                ConfigKey::SendTimeoutMs => self.send_timeout_ms = parse_number(*key, value)?,
                ConfigKey::KeyPrefix => self.key_prefix = value.to_string(),
                ConfigKey::StreamMaxLen => {
                    self.max_len = if value.is_empty() {
                        None
                    } else {
                        Some(parse_number(*key, value)?)
                    };
                }
            }
        }
        Ok(self)
    }

    /// Sets the broker URL.
    #[must_use]
    pub fn broker_url(mut self, url: impl Into<String>) -> Self {
        self.broker_url = url.into();
        self
    }

    /// Sets the user event destination.
    #[must_use]
    pub fn events_destination(mut self, name: impl Into<String>) -> Self {
        self.events_destination = name.into();
        self
    }

    /// Sets the admin event destination.
    #[must_use]
    pub fn admin_events_destination(mut self, name: impl Into<String>) -> Self {
        self.admin_events_destination = Some(name.into());
        self
    }

    /// Sends admin events to the user event destination.
    #[must_use]
    pub fn single_destination(mut self) -> Self {
        self.admin_events_destination = None;
        self
    }

    /// Sets the message format.
    #[must_use]
    pub const fn format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the publish timeout.
    #[must_use]
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the key prefix.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the approximate maximum stream length.
    #[must_use]
    pub const fn max_len(mut self, max_len: u64) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// Returns the publish timeout.
    #[must_use]
    pub const fn send_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Returns the destination admin events go to.
    #[must_use]
    pub fn admin_destination_name(&self) -> &str {
        self.admin_events_destination
            .as_deref()
            .unwrap_or(&self.events_destination)
    }

    /// Formats a key with the configured prefix.
    #[must_use]
    pub fn prefixed_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    /// Checks the values that cannot be defaulted.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error describing the first invalid value.
    pub fn validate(&self) -> RelayResult<()> {
        if self.broker_url.trim().is_empty() {
            return Err(RelayError::Configuration("broker URL is empty".to_string()));
        }
        if self.events_destination.trim().is_empty() {
            return Err(RelayError::Configuration(
                "events destination is empty".to_string(),
            ));
        }
        if self.send_timeout_ms == 0 {
            return Err(RelayError::Configuration(
                "send timeout must be positive".to_string(),
            ));
        }
        if self.max_len == Some(0) {
            return Err(RelayError::Configuration(
                "stream max length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_number(key: ConfigKey, value: &str) -> RelayResult<u64> {
    value.parse().map_err(|_| {
        RelayError::Configuration(format!(
            "{} must be a non-negative integer, got {value:?}",
            key.scope_key()
        ))
    })
}

fn default_broker_url() -> String {
    "redis://localhost:6379/0".to_string()
}

fn default_events_destination() -> String {
    "KeycloakEvents".to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_admin_events_destination() -> Option<String> {
    Some("KeycloakAdminEvents".to_string())
}

const fn default_send_timeout() -> u64 {
    5000
}

fn default_key_prefix() -> String {
    "kc:events".to_string()
}
