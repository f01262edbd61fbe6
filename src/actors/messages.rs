//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to a specific actor via mpsc
//! 2. **Deliveries**: Bus messages routed by the broker to consumer inboxes
//! 3. **Reports**: Plain data handed back when an actor stops

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::bus::{BusResult, ConnectionState};
use crate::pipe::interpreter::InterpreterStats;

/// Identifier the broker assigns to each attached client
pub type ClientId = u64;

/// Message published on the bus
///
/// Metric payloads stay opaque here; decoding them is the job of the
/// message handler behind the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    /// Stream the message was published on
    pub stream: String,

    /// Identity of the publishing client
    pub sender: String,

    /// Subject consumers filter on (e.g. `"temperature@rack-01"`)
    pub subject: String,

    /// Payload frames
    pub body: Vec<String>,

    /// When the broker accepted the message
    pub timestamp: DateTime<Utc>,
}

/// Commands that can be sent to the BrokerActor
#[derive(Debug)]
pub enum BrokerCommand {
    /// Register a client and its delivery inbox
    Attach {
        identity: String,
        deliver: mpsc::Sender<BusMessage>,
        respond_to: oneshot::Sender<ClientId>,
    },

    /// Forget a client (fire-and-forget, used on disconnect and drop)
    Detach { client: ClientId },

    /// Set the stream a client publishes to
    SetProducer {
        client: ClientId,
        stream: String,
        respond_to: oneshot::Sender<BusResult<()>>,
    },

    /// Replace the subscription of a client
    SetConsumer {
        client: ClientId,
        stream: String,
        pattern: String,
        respond_to: oneshot::Sender<BusResult<()>>,
    },

    /// Publish a message on the client's producer stream
    Publish {
        client: ClientId,
        subject: String,
        body: Vec<String>,
        respond_to: oneshot::Sender<BusResult<usize>>,
    },

    /// Get broker statistics
    GetStats {
        respond_to: oneshot::Sender<BrokerStats>,
    },

    /// Gracefully shut down the broker, acknowledged once it stops taking commands
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Broker statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Currently attached clients
    pub clients: usize,

    /// Clients with a producer stream
    pub producers: usize,

    /// Clients with a consumer subscription
    pub consumers: usize,

    /// Deliveries made to consumer inboxes
    pub messages_routed: u64,

    /// Deliveries dropped because an inbox was full
    pub messages_dropped: u64,
}

/// Agent statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentStats {
    /// Control messages taken from the pipe
    pub commands_processed: u64,

    /// Bus messages handed to the message handler
    pub messages_handled: u64,
}

/// Final report returned by an agent task when its loop exits
#[derive(Debug, Clone, Default)]
pub struct AgentReport {
    /// Connection state at the time the loop exited
    pub state: ConnectionState,

    /// Loop statistics
    pub stats: AgentStats,

    /// Interpreter outcome counters
    pub interpreter: InterpreterStats,

    /// Whether the loop ended on `$TERM` (as opposed to a closed pipe)
    pub terminated: bool,
}
