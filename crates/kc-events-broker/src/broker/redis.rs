//! Redis Streams broker.
//!
//! Destinations are stream keys (`{key_prefix}:{name}`). A message becomes
//! one stream entry added with `XADD`, one field per property. Redis has no
//! null value, so null properties are written as empty strings.
//! Consumers read the streams directly or through consumer groups.
//!
//! Each session is its own `fred` client, connected for one publish and
//! closed with `QUIT` afterwards. Sessions share nothing, so concurrent
//! publishes need no locking.
//!
//! The connection task is owned by the session. If the session (or the
//! future opening it) is dropped, the task is aborted and the socket closed.

use async_trait::async_trait;
use fred::cmd;
use fred::prelude::*;
use fred::types::ConnectHandle;

use super::{validate_destination_name, BrokerSession, Destination, MessageBroker};
use crate::config::RelayConfig;
use crate::error::{from_redis_error, RelayError, RelayResult};
use crate::message::OutboundMessage;

/// Redis Streams message broker.
#[derive(Debug, Clone)]
pub struct RedisBroker {
    redis_config: Config,
    connection: ConnectionConfig,
    config: RelayConfig,
}

impl RedisBroker {
    /// Creates a broker from the relay configuration.
    ///
    /// No connection is made here; the URL is only parsed. Connecting and
    /// internal commands are bounded by the send timeout.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error if the broker URL is invalid.
    pub fn new(config: RelayConfig) -> RelayResult<Self> {
        let redis_config = Config::from_url(&config.broker_url)
            .map_err(|e| RelayError::Configuration(e.to_string()))?;
        let timeout = config.send_timeout_duration();
        let connection = ConnectionConfig {
            connection_timeout: timeout,
            internal_command_timeout: timeout,
            max_command_attempts: 1,
            ..ConnectionConfig::default()
        };

        Ok(Self {
            redis_config,
            connection,
            config,
        })
    }

    /// Returns the relay configuration.
    #[must_use]
    pub const fn config(&self) -> &RelayConfig {
        &self.config
    }
}

#[async_trait]
impl MessageBroker for RedisBroker {
    fn resolve(&self, name: &str) -> RelayResult<Destination> {
        validate_destination_name(name)?;
        Ok(Destination::new(name, self.config.prefixed_key(name)))
    }

    async fn open_session(&self) -> RelayResult<Box<dyn BrokerSession>> {
        let client = Client::new(
            self.redis_config.clone(),
            None,
            Some(self.connection.clone()),
            None,
        );
        let task = ConnectionTask(client.connect());
        client.wait_for_connect().await.map_err(from_redis_error)?;

        Ok(Box::new(RedisSession {
            client,
            _task: task,
            max_len: self.config.max_len,
            closed: false,
        }))
    }
}

/// Aborts the client's connection task when dropped.
struct ConnectionTask(ConnectHandle);

impl Drop for ConnectionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct RedisSession {
    client: Client,
    _task: ConnectionTask,
    max_len: Option<u64>,
    closed: bool,
}

#[async_trait]
impl BrokerSession for RedisSession {
    async fn send(&mut self, destination: &Destination, message: &OutboundMessage) -> RelayResult<()> {
        if self.closed {
            return Err(RelayError::Closed);
        }
        let args = xadd_args(destination.address(), self.max_len, message);
        let entry_id: String = self
            .client
            .custom(cmd!("XADD"), args)
            .await
            .map_err(from_redis_error)?;

        tracing::trace!(stream = destination.address(), %entry_id, "stream entry added");
        Ok(())
    }

    async fn close(&mut self) -> RelayResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.client.quit().await.map_err(from_redis_error)
    }
}

/// Builds the `XADD` arguments for a message.
fn xadd_args(key: &str, max_len: Option<u64>, message: &OutboundMessage) -> Vec<String> {
    let mut args = Vec::with_capacity(4 + message.len() * 2);
    args.push(key.to_string());
    if let Some(max_len) = max_len {
        args.push("MAXLEN".to_string());
        args.push("~".to_string());
        args.push(max_len.to_string());
    }
    args.push("*".to_string());
    for (name, value) in message.properties() {
        args.push(name.to_string());
        args.push(value.unwrap_or_default().to_string());
    }
    args
}
