//! Actor-based agent runtime
//!
//! Each actor runs as an independent tokio task and is driven through a
//! cloneable handle that wraps its mpsc command channel.
//!
//! ## Architecture Overview
//!
//! ```text
//!     Supervisor
//!         │ control pipe (ControlMessage)
//!   ┌─────▼──────┐   connect / producer / consumer   ┌──────────────┐
//!   │ AgentActor ├──────────────────────────────────►│ BrokerActor  │
//!   │            │◄──────────────────────────────────┤ (in-process) │
//!   └─────┬──────┘        deliveries (BusMessage)    └──────▲───────┘
//!         │                                                 │ publish
//!   MessageHandler                                    other clients
//! ```
//!
//! ## Actor Types
//!
//! - **AgentActor**: Runs the command interpreter on its pipe and feeds bus traffic to a handler
//! - **BrokerActor**: Routes published messages to matching consumers
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel
//! 2. **Request/Response**: oneshot channels for broker replies
//! 3. **Reports**: The agent task returns an `AgentReport` when it stops

pub mod agent;
pub mod broker;
pub mod messages;
