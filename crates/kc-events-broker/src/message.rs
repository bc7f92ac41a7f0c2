//! Outbound message shaping.
//!
//! A deployment uses exactly one [`MessageFormat`]:
//!
//! - [`MessageFormat::JsonEnvelope`]: two properties, `MEDIA_TYPE` and
//!   `BODY`, the latter carrying the whole event as JSON.
//! - [`MessageFormat::FlatProperties`]: a handful of string properties
//!   extracted from the event, no body. User events without a user ID are
//!   not forwarded in this format.

use std::fmt;
use std::str::FromStr;

use kc_core::{AdminEvent, UserEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RelayError, RelayResult};

/// Property carrying the media type of `BODY`.
pub const MEDIA_TYPE: &str = "MEDIA_TYPE";
/// Property carrying the serialized event.
pub const BODY: &str = "BODY";
/// Media type of JSON envelopes.
pub const APPLICATION_JSON: &str = "application/json";

/// Discriminator property of flat messages.
pub const EVENT_KLASS: &str = "eventKlass";
/// Unique ID generated for each flat message.
pub const EVENT_ID: &str = "eventId";
/// User event kind.
pub const ACTION: &str = "action";
/// User event subject.
pub const USER_ID: &str = "userId";
/// Admin operation type.
pub const OPERATION: &str = "operation";
/// Client the admin acted through.
pub const CLIENT_ID: &str = "clientId";
/// Path of the resource an admin event affected.
pub const RESOURCE_PATH: &str = "resourcePath";
/// Resource representation of an admin event.
pub const REPRESENTATION: &str = "representation";

/// `eventKlass` of user events.
pub const USER_EVENT_KLASS: &str = "Event";
/// `eventKlass` of admin events.
pub const ADMIN_EVENT_KLASS: &str = "AdminEvent";

/// How events are encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageFormat {
    /// `MEDIA_TYPE` + JSON `BODY` properties.
    #[default]
    #[serde(rename = "json")]
    JsonEnvelope,
    /// Flat string properties, no body.
    #[serde(rename = "properties")]
    FlatProperties,
}

impl MessageFormat {
    /// Shapes an event into a message.
    ///
    /// Returns `Ok(None)` when the format does not forward this event.
    ///
    /// ## Errors
    ///
    /// Returns [`RelayError::Serialization`] if the event cannot be encoded.
    pub fn shape<E: Publishable>(self, event: &E) -> RelayResult<Option<OutboundMessage>> {
        match self {
            Self::JsonEnvelope => Ok(Some(OutboundMessage::json_envelope(event)?)),
            Self::FlatProperties => Ok(event.flat_properties()),
        }
    }

    /// Returns the configuration name of this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JsonEnvelope => "json",
            Self::FlatProperties => "properties",
        }
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageFormat {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "json-envelope" => Ok(Self::JsonEnvelope),
            "properties" | "flat-properties" => Ok(Self::FlatProperties),
            other => Err(RelayError::Configuration(format!(
                "unknown message format: {other}"
            ))),
        }
    }
}

/// A message ready to be sent: string properties, no body.
///
/// Property values may be null. Properties keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    properties: Vec<(String, Option<String>)>,
}

impl OutboundMessage {
    /// Creates an empty message.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    /// Creates a JSON envelope for a payload.
    ///
    /// ## Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn json_envelope<T: Serialize + ?Sized>(payload: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_string(payload)?;
        Ok(Self::new()
            .with_property(MEDIA_TYPE, Some(APPLICATION_JSON.to_string()))
            .with_property(BODY, Some(body)))
    }

    /// Sets a property, replacing any previous value.
    pub fn set_property(&mut self, name: impl Into<String>, value: Option<String>) {
        let name = name.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.properties.push((name, value)),
        }
    }

    /// Sets a property and returns the message.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.set_property(name, value);
        self
    }

    /// Returns the value of a property.
    ///
    /// `None` for both absent and null properties; use
    /// [`contains`](Self::contains) to tell them apart.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Returns whether the property is set (possibly to null).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.properties.iter().any(|(n, _)| n == name)
    }

    /// Iterates over properties in insertion order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.properties
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns whether the message has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Category of an event, used to pick its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// User events.
    User,
    /// Admin events.
    Admin,
}

/// An event the relay knows how to shape.
pub trait Publishable: Serialize + fmt::Display + Send + Sync {
    /// Destination category of this event type.
    const CATEGORY: EventCategory;

    /// Builds the flat-properties message, or `None` to skip the event.
    fn flat_properties(&self) -> Option<OutboundMessage>;
}

impl Publishable for UserEvent {
    const CATEGORY: EventCategory = EventCategory::User;

    fn flat_properties(&self) -> Option<OutboundMessage> {
        let user_id = self.user_id.clone()?;

        Some(
            OutboundMessage::new()
                .with_property(EVENT_KLASS, Some(USER_EVENT_KLASS.to_string()))
                .with_property(EVENT_ID, Some(new_event_id()))
                .with_property(ACTION, Some(self.event_type.as_str().to_string()))
                .with_property(USER_ID, Some(user_id)),
        )
    }
}

impl Publishable for AdminEvent {
    const CATEGORY: EventCategory = EventCategory::Admin;

    // Forwarded even without a client ID.
    fn flat_properties(&self) -> Option<OutboundMessage> {
        Some(
            OutboundMessage::new()
                .with_property(EVENT_KLASS, Some(ADMIN_EVENT_KLASS.to_string()))
                .with_property(EVENT_ID, Some(new_event_id()))
                .with_property(OPERATION, Some(self.operation_type.as_str().to_string()))
                .with_property(CLIENT_ID, self.auth_details.client_id.clone())
                .with_property(RESOURCE_PATH, Some(self.resource_path.clone()))
                .with_property(REPRESENTATION, self.representation.clone()),
        )
    }
}

fn new_event_id() -> String {
    Uuid::new_v4().to_string()
}
