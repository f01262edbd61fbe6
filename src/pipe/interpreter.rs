//! CommandInterpreter - Applies control pipe commands to a bus connection
//!
//! The interpreter validates strictly and fails softly: a malformed message,
//! a missing argument or a failed bus operation is logged and skipped, and
//! the caller is told to keep going. Only `$TERM` changes the caller's
//! control flow.
//!
//! ## Log levels
//!
//! - **error**: empty message, missing argument, failed bus operation
//! - **warn**: unknown command, `CONFIGURE` stub
//! - **info**: `$TERM`
//! - **debug**: command trace, reserved age command stub
//!
//! Every event is emitted into the interpreter's own [`Dispatch`], so two
//! interpreters in one process can log to different places.

use std::time::Duration;

use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, debug, error, info, warn};

use crate::bus::BusConnection;

use super::command::{AGE_CONFIG_COMMAND, Command};
use super::message::ControlMessage;

/// How long CONNECT waits for the broker
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// What the caller should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Continue,
    Terminate,
}

/// Outcome counters, one per error class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterStats {
    /// Commands that did what they asked for
    pub applied: u64,

    /// Messages with no frames
    pub malformed: u64,

    /// Commands missing a required argument
    pub missing_argument: u64,

    /// Bus operations that returned an error
    pub failed: u64,

    /// Unrecognized command names
    pub unknown: u64,

    /// Stub commands (`CONFIGURE`, reserved age command)
    pub unimplemented: u64,
}

/// Interprets control messages against a [`BusConnection`]
pub struct CommandInterpreter {
    dispatch: Dispatch,
    connect_timeout: Duration,
    stats: InterpreterStats,
}

impl CommandInterpreter {
    /// Create an interpreter logging to the current default subscriber
    pub fn new() -> Self {
        Self::with_dispatch(tracing::dispatcher::get_default(Dispatch::clone))
    }

    /// Create an interpreter logging to `dispatch`
    pub fn with_dispatch(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            connect_timeout: CONNECT_TIMEOUT,
            stats: InterpreterStats::default(),
        }
    }

    pub fn stats(&self) -> &InterpreterStats {
        &self.stats
    }

    /// Process one control message
    ///
    /// The message is consumed whatever the outcome. Returns
    /// [`Signal::Terminate`] for `$TERM` and [`Signal::Continue`] otherwise.
    pub async fn process<C>(&mut self, connection: &mut C, message: ControlMessage) -> Signal
    where
        C: BusConnection + ?Sized,
    {
        let dispatch = self.dispatch.clone();
        self.interpret(connection, message)
            .with_subscriber(dispatch)
            .await
    }

    async fn interpret<C>(&mut self, connection: &mut C, mut message: ControlMessage) -> Signal
    where
        C: BusConnection + ?Sized,
    {
        let Some(name) = message.pop_str() else {
            error!(
                "control pipe delivered a message with no frames; \
                 it is most probably empty, ignoring it"
            );
            self.stats.malformed += 1;
            return Signal::Continue;
        };

        debug!("actor command = '{name}'");

        let command = match Command::parse_args(name, message) {
            Ok(command) => command,
            Err(e) => {
                error!("{e}");
                self.stats.missing_argument += 1;
                return Signal::Continue;
            }
        };

        match command {
            Command::Terminate => {
                info!("got $TERM");
                return Signal::Terminate;
            }

            Command::Connect { endpoint, identity } => {
                let timeout = self.connect_timeout;
                match connection.connect(&endpoint, timeout, &identity).await {
                    Ok(()) => self.stats.applied += 1,
                    Err(e) => {
                        error!(
                            "connect (endpoint = '{endpoint}', timeout = '{}', identity = '{identity}') failed: {e}",
                            timeout.as_millis()
                        );
                        self.stats.failed += 1;
                    }
                }
            }

            Command::SetProducer { stream } => match connection.set_producer(&stream).await {
                Ok(()) => self.stats.applied += 1,
                Err(e) => {
                    error!("set producer (stream = '{stream}') failed: {e}");
                    self.stats.failed += 1;
                }
            },

            Command::SetConsumer { stream, pattern } => {
                match connection.set_consumer(&stream, &pattern).await {
                    Ok(()) => self.stats.applied += 1,
                    Err(e) => {
                        error!(
                            "set consumer (stream = '{stream}', pattern = '{pattern}') failed: {e}"
                        );
                        self.stats.failed += 1;
                    }
                }
            }

            Command::Configure { config_file } => {
                warn!("CONFIGURE '{config_file}': loading a config file is not implemented");
                self.stats.unimplemented += 1;
            }

            Command::SetAgeConfig => {
                debug!("{AGE_CONFIG_COMMAND} is not yet implemented!");
                self.stats.unimplemented += 1;
            }

            Command::Unknown { name } => {
                warn!("command '{name}' is unknown or not implemented");
                self.stats.unknown += 1;
            }
        }

        Signal::Continue
    }
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self::new()
    }
}
