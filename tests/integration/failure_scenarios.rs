//! Failure tests for the agent and its bus
//!
//! These tests verify the system handles failures gracefully:
//! - Broker going away under a connected client
//! - Endpoints that get bound late or never
//! - Unbound endpoints after a broker moves

use std::time::Duration;

use assert_matches::assert_matches;
use metric_store_agent::{
    actors::{agent::AgentHandle, agent::LoggingHandler, broker::BrokerHandle},
    bus::{BusConnection, BusError, Network},
    pipe::Signal,
};
use tracing::Level;

use crate::helpers::*;

#[tokio::test]
async fn test_broker_shutdown_under_connected_client() {
    let endpoint = "ipc://failure-shutdown";
    let (network, broker) = live_bus(endpoint);
    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    interpreter
        .process(&mut connection, message(&["CONNECT", endpoint, "agent"]))
        .await;
    assert!(connection.is_connected());

    broker.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let signal = interpreter
        .process(&mut connection, message(&["PRODUCER", "METRICS"]))
        .await;

    assert_eq!(signal, Signal::Continue);
    let errors = logs.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("METRICS"));
    assert_eq!(connection.state().producer, None);

    // The inbox closes with the broker
    assert!(connection.recv().await.is_none());
}

#[tokio::test]
async fn test_agent_keeps_running_after_broker_loss() {
    let endpoint = "ipc://failure-agent";
    let (network, broker) = live_bus(endpoint);
    let (interpreter, logs) = recorded_interpreter();

    let (agent, task) =
        AgentHandle::spawn_with("agent", network, interpreter, Box::new(LoggingHandler));

    agent.command(["CONNECT", endpoint, "agent"]).await.unwrap();
    agent
        .command(["CONSUMER", "METRICS", ".*"])
        .await
        .unwrap();

    for _ in 0..100 {
        if broker.get_stats().await.unwrap().consumers == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    broker.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    agent.command(["PRODUCER", "METRICS"]).await.unwrap();
    agent.terminate().await.unwrap();

    let report = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("agent should stop on $TERM")
        .unwrap();

    assert!(report.terminated);
    assert_eq!(report.interpreter.failed, 1);
    assert_eq!(logs.count(Level::ERROR), 1);
}

#[tokio::test]
async fn test_connect_succeeds_when_broker_binds_within_timeout() {
    let endpoint = "ipc://failure-late";
    let network = Network::new();
    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    let late_network = network.clone();
    let binder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        BrokerHandle::spawn_bound("late", &late_network, endpoint).unwrap()
    });

    interpreter
        .process(&mut connection, message(&["CONNECT", endpoint, "agent"]))
        .await;

    assert_eq!(logs.count(Level::ERROR), 0);
    assert!(connection.is_connected());

    binder.await.unwrap().shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unbound_endpoint_is_unreachable() {
    let endpoint = "ipc://failure-unbound";
    let (network, broker) = live_bus(endpoint);

    assert!(network.unbind(endpoint).is_some());

    let mut connection = client(&network);
    let result = connection
        .connect(endpoint, Duration::from_millis(50), "agent")
        .await;
    assert_matches!(result, Err(BusError::Timeout { .. }));

    broker.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_connect_after_shutdown_waits_for_rebind() {
    let endpoint = "ipc://failure-rebind";
    let (network, first) = live_bus(endpoint);
    first.shutdown().await.unwrap();

    let late_network = network.clone();
    let binder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        BrokerHandle::spawn_bound("second", &late_network, endpoint).unwrap()
    });

    let mut connection = client(&network);
    let (mut interpreter, logs) = recorded_interpreter();

    let started = tokio::time::Instant::now();
    interpreter
        .process(&mut connection, message(&["CONNECT", endpoint, "agent"]))
        .await;

    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(logs.count(Level::ERROR), 0);
    assert!(connection.is_connected());

    let second = binder.await.unwrap();
    assert_eq!(second.get_stats().await.unwrap().clients, 1);
    second.shutdown().await.unwrap();
}
