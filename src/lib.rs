//! Control plane of a bus-attached metric agent
//!
//! An agent owns one connection to a publish/subscribe bus. A supervisor
//! configures that connection at runtime by sending multi-frame commands on
//! the agent's control pipe (`CONNECT`, `PRODUCER`, `CONSUMER`, `$TERM`, ...).
//!
//! - [`pipe`]: control message parsing and the command interpreter
//! - [`bus`]: the `BusConnection` capability and an in-process bus
//! - [`actors`]: the broker and agent tasks
//! - [`config`], [`logging`], [`util`]: ambient setup for the binary

pub mod actors;
pub mod bus;
pub mod config;
pub mod logging;
pub mod pipe;
pub mod util;
