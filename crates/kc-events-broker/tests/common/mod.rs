//! Shared helpers for the relay tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use kc_events_broker::{
    BrokerEventListenerProvider, BrokerEventListenerProviderFactory, InMemoryBroker, RelayConfig,
};
use kc_spi::{MapConfig, ProviderFactory};
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// A log record captured by [`LogCapture`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Tracing layer that records every event.
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    /// Installs the capture as the thread's default subscriber.
    ///
    /// Tests must run on a current-thread runtime (the `#[tokio::test]` default).
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let guard = tracing_subscriber::registry()
            .with(capture.clone())
            .set_default();
        (capture, guard)
    }

    pub fn warnings(&self) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == Level::WARN)
            .cloned()
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: visitor.0,
        });
    }
}

#[derive(Default)]
struct FieldVisitor(HashMap<String, String>);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Builds an initialized listener over an in-memory broker.
pub async fn listener(
    broker: &InMemoryBroker,
    config: RelayConfig,
    scope: MapConfig,
) -> BrokerEventListenerProvider {
    let mut factory =
        BrokerEventListenerProviderFactory::with_config(config).broker(Arc::new(broker.clone()));
    factory.init(&scope).await.unwrap();
    factory.post_init().await.unwrap();
    factory.create().await.unwrap()
}
