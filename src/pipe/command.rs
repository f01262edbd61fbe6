//! Control pipe commands
//!
//! A [`ControlMessage`] is parsed into a [`Command`] in one pass. Parsing
//! consumes the message; anything after the frames a command needs is
//! ignored.
//!
//! ## Protocol
//!
//! | Frames                          | Command          |
//! |---------------------------------|------------------|
//! | `$TERM`                         | `Terminate`      |
//! | `CONNECT/endpoint/identity`     | `Connect`        |
//! | `PRODUCER/stream`               | `SetProducer`    |
//! | `CONSUMER/stream/pattern`       | `SetConsumer`    |
//! | `CONFIGURE/config_file`         | `Configure`      |
//! | `FTY_METRIC_STORE_AGE`          | `SetAgeConfig`   |
//! | anything else                   | `Unknown`        |

use std::fmt;

use super::message::ControlMessage;

pub const TERM_COMMAND: &str = "$TERM";
pub const CONNECT_COMMAND: &str = "CONNECT";
pub const PRODUCER_COMMAND: &str = "PRODUCER";
pub const CONSUMER_COMMAND: &str = "CONSUMER";
pub const CONFIGURE_COMMAND: &str = "CONFIGURE";

/// Reserved name for the metric age configuration command
pub const AGE_CONFIG_COMMAND: &str = "FTY_METRIC_STORE_AGE";

/// A decoded control command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stop the owning loop
    Terminate,

    /// Attach the connection to a broker
    Connect { endpoint: String, identity: String },

    /// Set the producer stream
    SetProducer { stream: String },

    /// Set the consumer subscription
    SetConsumer { stream: String, pattern: String },

    /// Load a configuration file (not implemented)
    Configure { config_file: String },

    /// Metric age configuration (reserved, not implemented)
    SetAgeConfig,

    /// Unrecognized command name, possibly empty
    Unknown { name: String },
}

/// Why a control message could not be turned into a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The message had no frames at all
    NoFrames,

    /// A required positional argument was absent
    MissingArgument {
        /// Command whose argument is missing
        command: &'static str,

        /// Name of the missing argument
        argument: &'static str,

        /// Full frame layout the command expects
        expected: &'static str,

        /// Frame layout actually received
        received: &'static str,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::NoFrames => write!(
                f,
                "control message has no frames, cannot read a command name"
            ),
            ParseError::MissingArgument {
                command,
                argument,
                expected,
                received,
            } => write!(
                f,
                "{} is missing argument '{}': expected multipart string format {}, received {}",
                command, argument, expected, received
            ),
        }
    }
}

impl std::error::Error for ParseError {}

impl Command {
    /// Decode a control message, consuming it
    pub fn parse(mut message: ControlMessage) -> Result<Self, ParseError> {
        let name = message.pop_str().ok_or(ParseError::NoFrames)?;
        Self::parse_args(name, message)
    }

    /// Decode the arguments of command `name` from the frames left after it
    pub fn parse_args(name: String, mut message: ControlMessage) -> Result<Self, ParseError> {
        let command = match name.as_str() {
            TERM_COMMAND => Command::Terminate,

            CONNECT_COMMAND => {
                let endpoint = message.pop_str();
                let identity = message.pop_str();

                match (endpoint, identity) {
                    (None, _) => {
                        return Err(missing(
                            CONNECT_COMMAND,
                            "endpoint",
                            "CONNECT/endpoint/identity",
                            "CONNECT/<absent>",
                        ));
                    }
                    (Some(_), None) => {
                        return Err(missing(
                            CONNECT_COMMAND,
                            "identity",
                            "CONNECT/endpoint/identity",
                            "CONNECT/endpoint/<absent>",
                        ));
                    }
                    (Some(endpoint), Some(identity)) => Command::Connect { endpoint, identity },
                }
            }

            PRODUCER_COMMAND => {
                let stream = message.pop_str().ok_or_else(|| {
                    missing(
                        PRODUCER_COMMAND,
                        "stream",
                        "PRODUCER/stream",
                        "PRODUCER/<absent>",
                    )
                })?;
                Command::SetProducer { stream }
            }

            CONSUMER_COMMAND => {
                let stream = message.pop_str();
                let pattern = message.pop_str();

                match (stream, pattern) {
                    (None, _) => {
                        return Err(missing(
                            CONSUMER_COMMAND,
                            "stream",
                            "CONSUMER/stream/pattern",
                            "CONSUMER/<absent>",
                        ));
                    }
                    (Some(_), None) => {
                        return Err(missing(
                            CONSUMER_COMMAND,
                            "pattern",
                            "CONSUMER/stream/pattern",
                            "CONSUMER/stream/<absent>",
                        ));
                    }
                    (Some(stream), Some(pattern)) => Command::SetConsumer { stream, pattern },
                }
            }

            CONFIGURE_COMMAND => {
                let config_file = message.pop_str().ok_or_else(|| {
                    missing(
                        CONFIGURE_COMMAND,
                        "config_file",
                        "CONFIGURE/config_file",
                        "CONFIGURE/<absent>",
                    )
                })?;
                Command::Configure { config_file }
            }

            AGE_CONFIG_COMMAND => Command::SetAgeConfig,

            _ => Command::Unknown { name },
        };

        Ok(command)
    }

    /// The wire name of this command
    pub fn name(&self) -> &str {
        match self {
            Command::Terminate => TERM_COMMAND,
            Command::Connect { .. } => CONNECT_COMMAND,
            Command::SetProducer { .. } => PRODUCER_COMMAND,
            Command::SetConsumer { .. } => CONSUMER_COMMAND,
            Command::Configure { .. } => CONFIGURE_COMMAND,
            Command::SetAgeConfig => AGE_CONFIG_COMMAND,
            Command::Unknown { name } => name.as_str(),
        }
    }

    /// Encode this command back into control message frames
    pub fn into_message(self) -> ControlMessage {
        match self {
            Command::Terminate => ControlMessage::from_frames([TERM_COMMAND]),
            Command::Connect { endpoint, identity } => {
                ControlMessage::from_frames([CONNECT_COMMAND.to_string(), endpoint, identity])
            }
            Command::SetProducer { stream } => {
                ControlMessage::from_frames([PRODUCER_COMMAND.to_string(), stream])
            }
            Command::SetConsumer { stream, pattern } => {
                ControlMessage::from_frames([CONSUMER_COMMAND.to_string(), stream, pattern])
            }
            Command::Configure { config_file } => {
                ControlMessage::from_frames([CONFIGURE_COMMAND.to_string(), config_file])
            }
            Command::SetAgeConfig => ControlMessage::from_frames([AGE_CONFIG_COMMAND]),
            Command::Unknown { name } => ControlMessage::from_frames([name]),
        }
    }
}

fn missing(
    command: &'static str,
    argument: &'static str,
    expected: &'static str,
    received: &'static str,
) -> ParseError {
    ParseError::MissingArgument {
        command,
        argument,
        expected,
        received,
    }
}
