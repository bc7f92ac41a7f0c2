//! The event relay.
//!
//! [`EventRelay::publish`] is the only entry point the listener uses. It
//! never fails: [`EventRelay::try_publish`] does the work and returns a
//! `Result`, and `publish` turns any error into a single `WARN` log line.
//!
//! No retries. A failed publish is lost.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use crate::broker::{BrokerSession, Destination, MessageBroker};
use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::message::{EventCategory, MessageFormat, OutboundMessage, Publishable};

/// What happened to a published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The message was accepted by the broker.
    Sent {
        /// Logical name of the destination.
        destination: String,
    },
    /// The message format does not forward this event.
    Skipped,
}

/// Publishes events to their destination.
///
/// Shared by every listener instance of a deployment (wrap in an `Arc`).
#[derive(Debug)]
pub struct EventRelay {
    broker: Arc<dyn MessageBroker>,
    format: MessageFormat,
    events: Destination,
    admin_events: Destination,
    send_timeout: Duration,
    closed: AtomicBool,
}

impl EventRelay {
    /// Creates a relay, resolving both destinations up front.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if the configuration is invalid or a
    /// destination cannot be resolved. The relay is unusable in that case.
    pub fn new(broker: Arc<dyn MessageBroker>, config: &RelayConfig) -> RelayResult<Self> {
        config.validate()?;
        let events = broker.resolve(&config.events_destination)?;
        let admin_events = broker.resolve(config.admin_destination_name())?;

        tracing::info!(
            format = %config.format,
            events = %events,
            admin_events = %admin_events,
            "event relay ready"
        );

        Ok(Self {
            broker,
            format: config.format,
            events,
            admin_events,
            send_timeout: config.send_timeout_duration(),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the message format.
    #[must_use]
    pub const fn format(&self) -> MessageFormat {
        self.format
    }

    /// Returns the destination for a category of events.
    #[must_use]
    pub const fn destination(&self, category: EventCategory) -> &Destination {
        match category {
            EventCategory::User => &self.events,
            EventCategory::Admin => &self.admin_events,
        }
    }

    /// Publishes an event, logging and dropping any failure.
    pub async fn publish<E: Publishable>(&self, event: &E) {
        match self.try_publish(event).await {
            Ok(PublishOutcome::Sent { destination }) => {
                tracing::debug!(%destination, event = %event, "event published");
            }
            Ok(PublishOutcome::Skipped) => {
                tracing::trace!(event = %event, format = %self.format, "event not forwarded");
            }
            Err(error) => {
                tracing::warn!(
                    event = %event,
                    error = %error,
                    "couldn't publish event to broker"
                );
            }
        }
    }

    /// Publishes an event.
    ///
    /// The session is closed whether or not the send succeeded.
    ///
    /// ## Errors
    ///
    /// Returns an error if the relay is closed, the event cannot be encoded,
    /// the broker cannot be reached, the send fails or the send timeout
    /// expires.
    pub async fn try_publish<E: Publishable>(&self, event: &E) -> RelayResult<PublishOutcome> {
        if self.is_closed() {
            return Err(RelayError::Closed);
        }
        let Some(message) = self.format.shape(event)? else {
            return Ok(PublishOutcome::Skipped);
        };
        let destination = self.destination(E::CATEGORY);

        self.send(destination, &message).await?;

        Ok(PublishOutcome::Sent {
            destination: destination.name().to_string(),
        })
    }

    async fn send(&self, destination: &Destination, message: &OutboundMessage) -> RelayResult<()> {
        let deadline = Instant::now() + self.send_timeout;
        let mut session = timeout_at(deadline, self.broker.open_session())
            .await
            .map_err(|_| RelayError::Timeout(self.send_timeout))??;

        let result = timeout_at(deadline, session.send(destination, message))
            .await
            .unwrap_or(Err(RelayError::Timeout(self.send_timeout)));

        close_session(session.as_mut(), self.send_timeout).await;
        result
    }

    /// Stops publishing. Later publishes fail with [`RelayError::Closed`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!(events = %self.events, "event relay closed");
        }
    }

    /// Returns whether [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// The message outcome is already decided here; a failed close is only worth a debug line.
async fn close_session(session: &mut dyn BrokerSession, limit: Duration) {
    match tokio::time::timeout(limit, session.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::debug!(%error, "failed to close broker session"),
        Err(_) => tracing::debug!(?limit, "timed out closing broker session"),
    }
}
