//! Test environment backed by an ephemeral Redis container.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

use std::collections::HashMap;

use fred::cmd;
use fred::prelude::*;
use kc_events_broker::RelayConfig;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::{Redis, REDIS_PORT};

/// One entry read back from a stream: its id and its fields.
pub type StreamEntry = (String, HashMap<String, String>);

/// A running Redis plus a client for inspecting the streams.
pub struct RedisEnv {
    _redis: ContainerAsync<Redis>,
    /// URL the relay should connect to.
    pub url: String,
    /// Client used to read streams back.
    pub client: Client,
}

impl RedisEnv {
    /// Starts Redis and connects the inspection client.
    pub async fn start() -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("kc_events_broker=debug")
            .with_test_writer()
            .try_init();

        let redis = Redis::default().with_tag("7-alpine").start().await?;
        let port = redis.get_host_port_ipv4(REDIS_PORT).await?;
        let url = format!("redis://127.0.0.1:{port}/0");

        let client = Client::new(Config::from_url(&url)?, None, None, None);
        client.init().await?;

        Ok(Self {
            _redis: redis,
            url,
            client,
        })
    }

    /// Relay configuration pointing at this Redis.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig::default().broker_url(&self.url)
    }

    /// Reads every entry of a stream, oldest first.
    pub async fn entries(&self, key: &str) -> anyhow::Result<Vec<StreamEntry>> {
        let entries = self
            .client
            .custom(cmd!("XRANGE"), vec![key, "-", "+"])
            .await?;
        Ok(entries)
    }

    /// Returns the number of entries in a stream.
    pub async fn stream_len(&self, key: &str) -> anyhow::Result<u64> {
        let len = self.client.custom(cmd!("XLEN"), vec![key]).await?;
        Ok(len)
    }
}
