//! Message bus connection layer
//!
//! This module provides the `BusConnection` capability the command
//! interpreter drives, together with an in-process bus that implements it.
//!
//! ## Design
//!
//! - **Trait-based**: `BusConnection` lets the interpreter run against any bus client
//! - **Async**: Operations are async so a connect can wait for its broker
//! - **All-or-nothing**: A failed operation leaves `ConnectionState` untouched
//!
//! ## Pieces
//!
//! - **Network**: endpoint namespace brokers bind to and clients resolve
//! - **BrokerClient**: the agent's connection, implements `BusConnection`
//! - **BrokerActor** (in `actors::broker`): routes messages between clients

pub mod client;
pub mod connection;
pub mod error;
pub mod network;

pub use client::BrokerClient;
pub use connection::{BusConnection, ConnectionState, Subscription};
pub use error::{BusError, BusResult};
pub use network::Network;
