//! Bus connection capability
//!
//! This module defines the `BusConnection` trait the command interpreter
//! drives. The trait only carries the three operations the control pipe can
//! trigger, so the interpreter can run against the in-process broker client
//! or against a test double.

use std::time::Duration;

use async_trait::async_trait;

use super::error::BusResult;

/// Consumer subscription: which published messages a client receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Stream the subscription listens on
    pub stream: String,

    /// Regular expression matched against message subjects
    pub pattern: String,
}

/// Observable state of a single bus connection
///
/// Every field starts unset. `endpoint` and `identity` are set together by a
/// successful connect; `producer` and `consumer` are overwritten by each
/// successful set call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub endpoint: Option<String>,
    pub identity: Option<String>,
    pub producer: Option<String>,
    pub consumer: Option<Subscription>,
}

/// Operations on the connection owned by an agent
///
/// Implementations must leave their state untouched when an operation
/// fails.
#[async_trait]
pub trait BusConnection: Send {
    /// Attach to the broker at `endpoint` under `identity`
    ///
    /// Waits at most `timeout` for a broker to be reachable.
    async fn connect(&mut self, endpoint: &str, timeout: Duration, identity: &str)
    -> BusResult<()>;

    /// Declare the stream this connection publishes to
    async fn set_producer(&mut self, stream: &str) -> BusResult<()>;

    /// Subscribe to messages on `stream` whose subject matches `pattern`
    async fn set_consumer(&mut self, stream: &str, pattern: &str) -> BusResult<()>;
}
