//! End-to-end forwarding through the listener, relay and in-memory broker.

mod common;

use std::sync::Arc;

use futures::future::join_all;
use kc_core::{AdminEvent, AuthDetails, EventType, OperationType, UserEvent};
use kc_events_broker::message::{
    ACTION, APPLICATION_JSON, BODY, CLIENT_ID, EVENT_ID, EVENT_KLASS, MEDIA_TYPE, OPERATION,
    REPRESENTATION, RESOURCE_PATH, USER_ID,
};
use kc_events_broker::{EventRelay, InMemoryBroker, MessageFormat, RelayConfig};
use kc_spi::{EventListenerProvider, MapConfig};
use uuid::Uuid;

use common::{listener, LogCapture};

fn flat() -> RelayConfig {
    RelayConfig::default().format(MessageFormat::FlatProperties)
}

#[tokio::test]
async fn excluded_user_events_are_not_sent() {
    let broker = InMemoryBroker::new();
    let listener = listener(
        &broker,
        RelayConfig::default(),
        MapConfig::new().with("excludes", "REFRESH_TOKEN,CODE_TO_TOKEN"),
    )
    .await;

    for kind in [EventType::Login, EventType::RefreshToken, EventType::CodeToToken, EventType::Logout] {
        listener
            .on_event(&UserEvent::builder(kind).user("u1").build())
            .await;
    }

    let actions: Vec<String> = broker
        .messages_for("KeycloakEvents")
        .iter()
        .map(|m| {
            let body: serde_json::Value = serde_json::from_str(m.property(BODY).unwrap()).unwrap();
            body["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(actions, vec!["LOGIN", "LOGOUT"]);
    // Excluded events never reach the broker, not even as a session.
    assert_eq!(broker.sessions_opened(), 2);
}

#[tokio::test]
async fn admin_events_are_never_filtered() {
    let broker = InMemoryBroker::new();
    let every_kind = EventType::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let listener = listener(
        &broker,
        RelayConfig::default(),
        MapConfig::new().with("excludes", every_kind),
    )
    .await;

    listener
        .on_event(&UserEvent::builder(EventType::Login).user("u1").build())
        .await;
    for operation in OperationType::ALL {
        listener
            .on_admin_event(&AdminEvent::builder(*operation, "users/u1").build(), true)
            .await;
    }

    assert!(broker.messages_for("KeycloakEvents").is_empty());
    assert_eq!(
        broker.messages_for("KeycloakAdminEvents").len(),
        OperationType::ALL.len()
    );
}

#[tokio::test]
async fn flat_user_event_without_user_is_not_sent() {
    let broker = InMemoryBroker::new();
    let listener = listener(&broker, flat(), MapConfig::new()).await;

    listener
        .on_event(&UserEvent::builder(EventType::LoginError).error("user_not_found").build())
        .await;

    assert!(broker.messages().is_empty());
    assert_eq!(broker.sessions_opened(), 0);
}

#[tokio::test]
async fn flat_login_message() {
    let broker = InMemoryBroker::new();
    let listener = listener(&broker, flat(), MapConfig::new()).await;

    listener
        .on_event(&UserEvent::builder(EventType::Login).user("u1").build())
        .await;

    let messages = broker.messages_for("KeycloakEvents");
    assert_eq!(messages.len(), 1);
    let message = &messages[0];

    let mut names: Vec<&str> = message.properties().map(|(name, _)| name).collect();
    names.sort_unstable();
    assert_eq!(names, vec![ACTION, EVENT_ID, EVENT_KLASS, USER_ID]);
    assert_eq!(message.property(EVENT_KLASS), Some("Event"));
    assert_eq!(message.property(ACTION), Some("LOGIN"));
    assert_eq!(message.property(USER_ID), Some("u1"));

    let event_id = message.property(EVENT_ID).unwrap();
    assert_eq!(event_id.len(), 36);
    assert!(Uuid::parse_str(event_id).is_ok());
}

#[tokio::test]
async fn flat_admin_update_message() {
    let broker = InMemoryBroker::new();
    let listener = listener(&broker, flat(), MapConfig::new()).await;

    listener
        .on_admin_event(
            &AdminEvent::builder(OperationType::Update, "users/u1")
                .auth(AuthDetails::for_client("admin-cli"))
                .build(),
            false,
        )
        .await;

    let messages = broker.messages_for("KeycloakAdminEvents");
    assert_eq!(messages.len(), 1);
    let message = &messages[0];

    assert_eq!(message.len(), 6);
    assert_eq!(message.property(EVENT_KLASS), Some("AdminEvent"));
    assert_eq!(message.property(OPERATION), Some("UPDATE"));
    assert_eq!(message.property(CLIENT_ID), Some("admin-cli"));
    assert_eq!(message.property(RESOURCE_PATH), Some("users/u1"));
    assert!(message.contains(REPRESENTATION));
    assert_eq!(message.property(REPRESENTATION), None);
    assert!(Uuid::parse_str(message.property(EVENT_ID).unwrap()).is_ok());
}

#[tokio::test]
async fn representation_is_forwarded_only_when_included() {
    let broker = InMemoryBroker::new();
    let listener = listener(&broker, flat(), MapConfig::new()).await;
    let event = AdminEvent::builder(OperationType::Create, "clients/c1")
        .representation(r#"{"clientId":"app"}"#)
        .build();

    listener.on_admin_event(&event, true).await;
    listener.on_admin_event(&event, false).await;

    let messages = broker.messages_for("KeycloakAdminEvents");
    assert_eq!(messages[0].property(REPRESENTATION), Some(r#"{"clientId":"app"}"#));
    assert_eq!(messages[1].property(REPRESENTATION), None);
}

#[tokio::test]
async fn json_envelope_round_trips_both_event_kinds() {
    let broker = InMemoryBroker::new();
    let listener = listener(&broker, RelayConfig::default(), MapConfig::new()).await;

    let time = chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
    let user = UserEvent::builder(EventType::UpdatePassword)
        .time(time)
        .realm("master")
        .client("account-console")
        .user("u1")
        .session("s1")
        .ip_address("10.0.0.1")
        .detail("context", "ACCOUNT")
        .build();
    let admin = AdminEvent::builder(OperationType::Update, "users/u1")
        .time(time)
        .realm("master")
        .auth(AuthDetails {
            realm_id: Some("master".to_string()),
            client_id: Some("admin-cli".to_string()),
            user_id: Some("admin".to_string()),
            ip_address: Some("10.0.0.2".to_string()),
        })
        .resource_type("USER")
        .representation(r#"{"enabled":true}"#)
        .build();

    listener.on_event(&user).await;
    listener.on_admin_event(&admin, true).await;

    let user_message = &broker.messages_for("KeycloakEvents")[0];
    assert_eq!(user_message.len(), 2);
    assert_eq!(user_message.property(MEDIA_TYPE), Some(APPLICATION_JSON));
    let decoded: UserEvent = serde_json::from_str(user_message.property(BODY).unwrap()).unwrap();
    assert_eq!(decoded, user);

    let admin_message = &broker.messages_for("KeycloakAdminEvents")[0];
    assert_eq!(admin_message.len(), 2);
    assert_eq!(admin_message.property(MEDIA_TYPE), Some(APPLICATION_JSON));
    let decoded: AdminEvent = serde_json::from_str(admin_message.property(BODY).unwrap()).unwrap();
    assert_eq!(decoded, admin);
}

#[tokio::test]
async fn send_failure_logs_one_warning_in_each_format() {
    for config in [RelayConfig::default(), flat()] {
        let (capture, _guard) = LogCapture::install();
        let broker = InMemoryBroker::new();
        let listener = listener(&broker, config, MapConfig::new()).await;
        broker.fail_sends(true);

        let event = UserEvent::builder(EventType::Login).realm("master").user("u1").build();
        listener.on_event(&event).await;

        let warnings = capture.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field("event"), Some(event.to_string().as_str()));
        assert!(warnings[0]
            .field("error")
            .unwrap()
            .contains("broker rejected message"));
        assert!(broker.messages().is_empty());
        assert_eq!(broker.sessions_closed(), 1);
    }
}

#[tokio::test]
async fn unreachable_broker_logs_one_warning_for_admin_event() {
    let (capture, _guard) = LogCapture::install();
    let broker = InMemoryBroker::new();
    let listener = listener(&broker, flat(), MapConfig::new()).await;
    broker.fail_sessions(true);

    let event = AdminEvent::builder(OperationType::Delete, "groups/g1")
        .auth(AuthDetails::for_client("admin-cli"))
        .build();
    listener.on_admin_event(&event, false).await;

    let warnings = capture.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("event"), Some(event.to_string().as_str()));
    assert!(warnings[0].field("error").unwrap().contains("broker unreachable"));
}

#[tokio::test]
async fn concurrent_publishes_stay_separate() {
    let broker = InMemoryBroker::new();
    let relay = Arc::new(EventRelay::new(Arc::new(broker.clone()), &flat()).unwrap());

    let events: Vec<UserEvent> = (0..64)
        .map(|i| {
            let kind = EventType::ALL[i % EventType::ALL.len()];
            UserEvent::builder(kind).user(format!("user-{i}")).build()
        })
        .collect();

    let tasks = events.iter().map(|event| {
        let relay = Arc::clone(&relay);
        async move { relay.publish(event).await }
    });
    join_all(tasks).await;

    let messages = broker.messages_for("KeycloakEvents");
    assert_eq!(messages.len(), events.len());

    let mut event_ids: Vec<&str> = messages
        .iter()
        .map(|m| m.property(EVENT_ID).unwrap())
        .collect();
    event_ids.sort_unstable();
    event_ids.dedup();
    assert_eq!(event_ids.len(), events.len());

    for message in &messages {
        let user_id = message.property(USER_ID).unwrap();
        let index: usize = user_id.trim_start_matches("user-").parse().unwrap();
        assert_eq!(message.property(ACTION), Some(events[index].event_type.as_str()));
        assert_eq!(message.len(), 4);
    }
}
