//! Helper functions for integration tests

use metric_store_agent::{
    actors::broker::BrokerHandle,
    bus::{BrokerClient, Network},
    logging::LogRecorder,
    pipe::{CommandInterpreter, ControlMessage},
};

/// Start an in-process broker bound at `endpoint` on a fresh network
pub fn live_bus(endpoint: &str) -> (Network, BrokerHandle) {
    let network = Network::new();
    let broker = BrokerHandle::spawn_bound("malamute", &network, endpoint).unwrap();
    (network, broker)
}

/// Interpreter whose logs go only to the returned recorder
pub fn recorded_interpreter() -> (CommandInterpreter, LogRecorder) {
    let recorder = LogRecorder::new();
    (
        CommandInterpreter::with_dispatch(recorder.dispatch()),
        recorder,
    )
}

pub fn message(frames: &[&str]) -> ControlMessage {
    ControlMessage::from_frames(frames.iter().copied())
}

pub fn client(network: &Network) -> BrokerClient {
    BrokerClient::new(network.clone())
}
