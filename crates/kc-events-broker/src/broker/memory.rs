//! In-memory broker.
//!
//! Keeps every sent message in memory. Failures and latency can be injected
//! to exercise the relay's error handling.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{validate_destination_name, BrokerSession, Destination, MessageBroker};
use crate::error::{RelayError, RelayResult};
use crate::message::OutboundMessage;

/// A message accepted by the [`InMemoryBroker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Logical name of the destination.
    pub destination: String,
    /// The message as sent.
    pub message: OutboundMessage,
}

#[derive(Debug, Default)]
struct State {
    known_destinations: Option<HashSet<String>>,
    sent: RwLock<Vec<SentMessage>>,
    fail_sessions: AtomicBool,
    fail_sends: AtomicBool,
    send_delay: RwLock<Option<Duration>>,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
}

/// In-memory message broker.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<State>,
}

impl InMemoryBroker {
    /// Creates a broker that accepts any destination name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a broker that only resolves the given destinations.
    #[must_use]
    pub fn with_destinations<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(State {
                known_destinations: Some(names.into_iter().map(Into::into).collect()),
                ..State::default()
            }),
        }
    }

    /// Makes `open_session` fail (or succeed again).
    pub fn fail_sessions(&self, fail: bool) {
        self.state.fail_sessions.store(fail, Ordering::SeqCst);
    }

    /// Makes `send` fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.state.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Delays every send.
    pub fn set_send_delay(&self, delay: Option<Duration>) {
        *self.state.send_delay.write() = delay;
    }

    /// Returns all sent messages, in send order.
    #[must_use]
    pub fn messages(&self) -> Vec<SentMessage> {
        self.state.sent.read().clone()
    }

    /// Returns the messages sent to one destination.
    #[must_use]
    pub fn messages_for(&self, destination: &str) -> Vec<OutboundMessage> {
        self.state
            .sent
            .read()
            .iter()
            .filter(|m| m.destination == destination)
            .map(|m| m.message.clone())
            .collect()
    }

    /// Clears all sent messages.
    pub fn clear(&self) {
        self.state.sent.write().clear();
    }

    /// Returns the number of sessions opened so far.
    #[must_use]
    pub fn sessions_opened(&self) -> usize {
        self.state.sessions_opened.load(Ordering::SeqCst)
    }

    /// Returns the number of sessions closed so far.
    #[must_use]
    pub fn sessions_closed(&self) -> usize {
        self.state.sessions_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    fn resolve(&self, name: &str) -> RelayResult<Destination> {
        validate_destination_name(name)?;
        if let Some(known) = &self.state.known_destinations {
            if !known.contains(name) {
                return Err(RelayError::Configuration(format!(
                    "destination not found: {name}"
                )));
            }
        }
        Ok(Destination::new(name, name))
    }

    async fn open_session(&self) -> RelayResult<Box<dyn BrokerSession>> {
        if self.state.fail_sessions.load(Ordering::SeqCst) {
            return Err(RelayError::Connection("broker unreachable".to_string()));
        }
        self.state.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession {
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

struct InMemorySession {
    state: Arc<State>,
    closed: bool,
}

#[async_trait]
impl BrokerSession for InMemorySession {
    async fn send(&mut self, destination: &Destination, message: &OutboundMessage) -> RelayResult<()> {
        if self.closed {
            return Err(RelayError::Closed);
        }
        let delay = *self.state.send_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.fail_sends.load(Ordering::SeqCst) {
            return Err(RelayError::Send("broker rejected message".to_string()));
        }
        self.state.sent.write().push(SentMessage {
            destination: destination.name().to_string(),
            message: message.clone(),
        });
        Ok(())
    }

    async fn close(&mut self) -> RelayResult<()> {
        if !self.closed {
            self.closed = true;
            self.state.sessions_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
