//! Control pipe commands against a live in-process bus
//!
//! Each test drives a `CommandInterpreter` directly and inspects what it
//! logged through a `LogRecorder`.

use metric_store_agent::bus::{ConnectionState, Subscription};
use metric_store_agent::pipe::{ControlMessage, Signal};
use pretty_assertions::assert_eq;
use tracing::Level;

use crate::helpers::*;

const ENDPOINT: &str = "ipc://ms-test-actor-commands";

#[tokio::test]
async fn test_empty_message_is_an_error() {
    let (network, broker) = live_bus(ENDPOINT);
    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    let signal = interpreter
        .process(&mut connection, ControlMessage::new())
        .await;

    assert_eq!(signal, Signal::Continue);
    assert!(logs.count(Level::ERROR) >= 1);
    assert_eq!(connection.state(), &ConnectionState::default());

    broker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_empty_string_and_unknown_commands_warn() {
    let (network, broker) = live_bus(ENDPOINT);
    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    for frames in [&[""][..], &["MAGIC!"][..]] {
        logs.clear();

        let signal = interpreter.process(&mut connection, message(frames)).await;

        assert_eq!(signal, Signal::Continue);
        assert_eq!(logs.count(Level::WARN), 1);
        assert_eq!(logs.count(Level::ERROR), 0);
    }

    assert_eq!(connection.state(), &ConnectionState::default());

    broker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_arguments_are_errors() {
    let (network, broker) = live_bus(ENDPOINT);
    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    let cases: [(&[&str], &str); 6] = [
        (&["CONFIGURE"], "config_file"),
        (&["CONNECT", ENDPOINT], "identity"),
        (&["CONNECT"], "endpoint"),
        (&["CONSUMER", "some-stream"], "pattern"),
        (&["CONSUMER"], "stream"),
        (&["PRODUCER"], "stream"),
    ];

    for (frames, argument) in cases {
        logs.clear();

        let signal = interpreter.process(&mut connection, message(frames)).await;

        assert_eq!(signal, Signal::Continue);
        let errors = logs.at_level(Level::ERROR);
        assert_eq!(errors.len(), 1, "frames {frames:?}");
        assert!(
            errors[0].message.contains(&format!("'{argument}'")),
            "error for {frames:?} should name '{argument}': {}",
            errors[0].message
        );
    }

    assert!(!connection.is_connected());
    assert_eq!(connection.state(), &ConnectionState::default());

    broker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_connect_to_bad_endpoint() {
    let (network, broker) = live_bus(ENDPOINT);
    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    let signal = interpreter
        .process(
            &mut connection,
            message(&["CONNECT", "ipc://bios-ws-server-BAD", "test-agent"]),
        )
        .await;

    assert_eq!(signal, Signal::Continue);
    let errors = logs.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("ipc://bios-ws-server-BAD"));
    assert!(errors[0].message.contains("1000"));
    assert!(errors[0].message.contains("test-agent"));
    assert!(!connection.is_connected());

    broker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_configure_sequence_on_live_bus() {
    let (network, broker) = live_bus(ENDPOINT);
    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    let signal = interpreter
        .process(&mut connection, message(&["$TERM"]))
        .await;
    assert_eq!(signal, Signal::Terminate);

    for frames in [
        &["CONNECT", ENDPOINT, "test-agent"][..],
        &["CONSUMER", "some-stream", ".+@.+"][..],
        &["PRODUCER", "some-stream"][..],
    ] {
        let signal = interpreter.process(&mut connection, message(frames)).await;
        assert_eq!(signal, Signal::Continue);
    }

    assert_eq!(logs.count(Level::ERROR), 0);
    assert_eq!(
        connection.state(),
        &ConnectionState {
            endpoint: Some(ENDPOINT.to_string()),
            identity: Some("test-agent".to_string()),
            producer: Some("some-stream".to_string()),
            consumer: Some(Subscription {
                stream: "some-stream".to_string(),
                pattern: ".+@.+".to_string(),
            }),
        }
    );

    let stats = broker.get_stats().await.unwrap();
    assert_eq!(stats.clients, 1);
    assert_eq!(stats.producers, 1);
    assert_eq!(stats.consumers, 1);

    broker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bad_commands_leave_configured_state_alone() {
    let (network, broker) = live_bus(ENDPOINT);
    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    for frames in [
        &["CONNECT", ENDPOINT, "test-agent"][..],
        &["CONSUMER", "some-stream", ".+@.+"][..],
        &["PRODUCER", "some-stream"][..],
    ] {
        interpreter.process(&mut connection, message(frames)).await;
    }
    let configured = connection.state().clone();
    assert_eq!(logs.count(Level::ERROR), 0);

    for frames in [
        &["CONSUMER", "some-stream"][..],
        &["CONSUMER"][..],
        &["PRODUCER"][..],
        &["CONSUMER", "some-stream", "(unclosed"][..],
        &["PRODUCER", ""][..],
        &["CONNECT", "ipc://bad-endpoint", "test-agent"][..],
        &["CONNECT", "not-an-endpoint", "test-agent"][..],
    ] {
        logs.clear();

        let signal = interpreter.process(&mut connection, message(frames)).await;

        assert_eq!(signal, Signal::Continue);
        assert_eq!(logs.count(Level::ERROR), 1, "frames {frames:?}");
        assert_eq!(connection.state(), &configured, "frames {frames:?}");
    }

    assert!(connection.is_connected());

    broker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_roles_before_connect_fail_softly() {
    let (network, broker) = live_bus(ENDPOINT);
    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    let signal = interpreter
        .process(&mut connection, message(&["PRODUCER", "some-stream"]))
        .await;

    assert_eq!(signal, Signal::Continue);
    let errors = logs.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("some-stream"));
    assert_eq!(interpreter.stats().failed, 1);

    broker.shutdown().await.unwrap();
}
