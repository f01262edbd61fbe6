//! Control pipe protocol
//!
//! Control messages arrive as multi-frame strings, are parsed into a typed
//! [`Command`] and applied to the agent's bus connection by the
//! [`CommandInterpreter`].

pub mod command;
pub mod interpreter;
pub mod message;

pub use command::{Command, ParseError};
pub use interpreter::{CONNECT_TIMEOUT, CommandInterpreter, InterpreterStats, Signal};
pub use message::ControlMessage;
