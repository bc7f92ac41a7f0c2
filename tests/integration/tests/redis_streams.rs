//! Publishing to Redis Streams.

use std::sync::Arc;
use std::time::Duration;

use kc_core::{AdminEvent, AuthDetails, EventType, OperationType, UserEvent};
use kc_events_broker::message::{APPLICATION_JSON, BODY, MEDIA_TYPE};
use kc_events_broker::{
    BrokerEventListenerProvider, BrokerEventListenerProviderFactory, EventRelay, MessageFormat,
    PublishOutcome, RedisBroker, RelayConfig, RelayError,
};
use kc_events_integration_tests::RedisEnv;
use kc_spi::{EventListenerProvider, MapConfig, ProviderFactory};

async fn provider(
    config: RelayConfig,
    scope: MapConfig,
) -> anyhow::Result<(BrokerEventListenerProviderFactory, BrokerEventListenerProvider)> {
    let mut factory = BrokerEventListenerProviderFactory::with_config(config);
    factory.init(&scope).await?;
    factory.post_init().await?;
    let provider = factory.create().await?;
    Ok((factory, provider))
}

#[tokio::test]
#[ignore = "requires docker"]
async fn json_envelope_lands_in_the_events_stream() -> anyhow::Result<()> {
    let env = RedisEnv::start().await?;
    let (mut factory, listener) = provider(env.relay_config(), MapConfig::new()).await?;

    let event = UserEvent::builder(EventType::Login)
        .realm("master")
        .client("account")
        .user("u1")
        .build();
    listener.on_event(&event).await;

    let entries = env.entries("kc:events:KeycloakEvents").await?;
    assert_eq!(entries.len(), 1);
    let (_, fields) = &entries[0];
    assert_eq!(fields.len(), 2);
    assert_eq!(fields.get(MEDIA_TYPE).map(String::as_str), Some(APPLICATION_JSON));
    let decoded: UserEvent = serde_json::from_str(&fields[BODY])?;
    assert_eq!(decoded, event);

    assert_eq!(env.stream_len("kc:events:KeycloakAdminEvents").await?, 0);
    factory.close();
    Ok(())
}

#[tokio::test]
#[ignore = "requires docker"]
async fn flat_admin_event_writes_every_property() -> anyhow::Result<()> {
    let env = RedisEnv::start().await?;
    let config = env.relay_config().format(MessageFormat::FlatProperties);
    let (mut factory, listener) = provider(config, MapConfig::new()).await?;

    let event = AdminEvent::builder(OperationType::Update, "users/u1")
        .auth(AuthDetails::for_client("admin-cli"))
        .representation(r#"{"enabled":false}"#)
        .build();
    listener.on_admin_event(&event, false).await;

    let entries = env.entries("kc:events:KeycloakAdminEvents").await?;
    assert_eq!(entries.len(), 1);
    let (_, fields) = &entries[0];
    assert_eq!(fields["eventKlass"], "AdminEvent");
    assert_eq!(fields["operation"], "UPDATE");
    assert_eq!(fields["clientId"], "admin-cli");
    assert_eq!(fields["resourcePath"], "users/u1");
    assert!(uuid::Uuid::parse_str(&fields["eventId"]).is_ok());
    assert_eq!(fields["representation"], "");
    assert_eq!(fields.len(), 6);

    factory.close();
    Ok(())
}

#[tokio::test]
#[ignore = "requires docker"]
async fn scope_keys_override_destinations() -> anyhow::Result<()> {
    let env = RedisEnv::start().await?;
    let scope = MapConfig::new()
        .with("keyPrefix", "audit")
        .with("eventsDestination", "Everything")
        .with("adminEventsDestination", "")
        .with("excludes", "REFRESH_TOKEN");
    let (mut factory, listener) = provider(env.relay_config(), scope).await?;

    listener
        .on_event(&UserEvent::builder(EventType::RefreshToken).user("u1").build())
        .await;
    listener
        .on_event(&UserEvent::builder(EventType::Logout).user("u1").build())
        .await;
    listener
        .on_admin_event(&AdminEvent::builder(OperationType::Delete, "users/u1").build(), true)
        .await;

    assert_eq!(env.stream_len("audit:Everything").await?, 2);
    factory.close();
    Ok(())
}

#[tokio::test]
#[ignore = "requires docker"]
async fn concurrent_publishes_each_add_one_entry() -> anyhow::Result<()> {
    let env = RedisEnv::start().await?;
    let config = env.relay_config().format(MessageFormat::FlatProperties);
    let relay = Arc::new(EventRelay::new(Arc::new(RedisBroker::new(config.clone())?), &config)?);

    let mut tasks = Vec::new();
    for i in 0..20 {
        let relay = Arc::clone(&relay);
        tasks.push(tokio::spawn(async move {
            let event = UserEvent::builder(EventType::Login)
                .user(format!("user-{i}"))
                .build();
            relay.try_publish(&event).await
        }));
    }
    for task in tasks {
        assert!(matches!(task.await?, Ok(PublishOutcome::Sent { .. })));
    }

    let entries = env.entries("kc:events:KeycloakEvents").await?;
    assert_eq!(entries.len(), 20);
    for (_, fields) in &entries {
        assert_eq!(fields.len(), 4);
        assert!(fields["userId"].starts_with("user-"));
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_redis_fails_without_panicking() -> anyhow::Result<()> {
    let config = RelayConfig::default()
        .broker_url("redis://127.0.0.1:1/0")
        .send_timeout(Duration::from_millis(500));
    let relay = EventRelay::new(Arc::new(RedisBroker::new(config.clone())?), &config)?;
    let event = UserEvent::builder(EventType::Login).user("u1").build();

    let err = relay.try_publish(&event).await.unwrap_err();
    assert!(matches!(
        err,
        RelayError::Connection(_) | RelayError::Timeout(_)
    ));

    relay.publish(&event).await;
    Ok(())
}
