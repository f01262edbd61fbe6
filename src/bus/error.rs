//! Error types for bus operations

use std::fmt;
use std::time::Duration;

/// Result type alias for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Errors that can occur while talking to the message bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Endpoint string is not of the form `scheme://address`
    InvalidEndpoint(String),

    /// Another broker is already bound at this endpoint
    AddressInUse(String),

    /// No broker showed up at the endpoint within the timeout
    Timeout { endpoint: String, timeout: Duration },

    /// Operation requires a connected client
    NotConnected,

    /// Publishing requires a producer stream
    NoProducer,

    /// Stream name was rejected by the broker
    InvalidStream(String),

    /// Consumer pattern is not a valid regular expression
    InvalidPattern { pattern: String, reason: String },

    /// The broker went away while a request was in flight
    BrokerUnavailable,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::InvalidEndpoint(endpoint) => {
                write!(f, "invalid endpoint '{}'", endpoint)
            }
            BusError::AddressInUse(endpoint) => {
                write!(f, "endpoint '{}' is already bound", endpoint)
            }
            BusError::Timeout { endpoint, timeout } => write!(
                f,
                "no broker at '{}' after {}ms",
                endpoint,
                timeout.as_millis()
            ),
            BusError::NotConnected => write!(f, "client is not connected"),
            BusError::NoProducer => write!(f, "client has no producer stream"),
            BusError::InvalidStream(stream) => write!(f, "invalid stream name '{}'", stream),
            BusError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid consumer pattern '{}': {}", pattern, reason)
            }
            BusError::BrokerUnavailable => write!(f, "broker is no longer running"),
        }
    }
}

impl std::error::Error for BusError {}
