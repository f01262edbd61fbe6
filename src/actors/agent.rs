//! AgentActor - The worker that owns the bus connection
//!
//! The agent waits on two sources at once:
//!
//! ```text
//! Control pipe ──► CommandInterpreter ──► BrokerClient (connect / producer / consumer)
//!                                               │
//! Bus inbox ◄───────────────────────────────────┘
//!     │
//!     └──► MessageHandler (metric store, graph responder, ...)
//! ```
//!
//! Control messages always win when both sources are ready. The loop ends on
//! `$TERM` or when every `AgentHandle` is dropped, and hands back an
//! `AgentReport`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace, warn};

use crate::bus::{BrokerClient, Network};
use crate::pipe::{Command, CommandInterpreter, ControlMessage, Signal};

use super::messages::{AgentReport, AgentStats, BusMessage};

/// Capacity of the control pipe
const PIPE_SIZE: usize = 32;

/// Consumer of application traffic delivered to the agent
#[async_trait]
pub trait MessageHandler: Send {
    async fn handle(&mut self, message: BusMessage);
}

/// Handler that only traces what it receives
#[derive(Debug, Default)]
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&mut self, message: BusMessage) {
        trace!(
            "received '{}' from '{}' on '{}' ({} frames)",
            message.subject,
            message.sender,
            message.stream,
            message.body.len()
        );
    }
}

/// Actor driving one bus connection from its control pipe
pub struct AgentActor {
    /// Agent name for logging
    name: String,

    interpreter: CommandInterpreter,

    /// The single connection this agent owns
    connection: BrokerClient,

    /// Control pipe receiver
    pipe_rx: mpsc::Receiver<ControlMessage>,

    /// Application message consumer
    handler: Box<dyn MessageHandler>,

    stats: AgentStats,
}

impl AgentActor {
    pub fn new(
        name: impl Into<String>,
        interpreter: CommandInterpreter,
        connection: BrokerClient,
        pipe_rx: mpsc::Receiver<ControlMessage>,
        handler: Box<dyn MessageHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            interpreter,
            connection,
            pipe_rx,
            handler,
            stats: AgentStats::default(),
        }
    }

    /// Run the actor's main loop
    ///
    /// This runs until:
    /// - `$TERM` arrives on the pipe
    /// - The pipe is closed
    #[instrument(skip(self), fields(agent = %self.name))]
    pub async fn run(mut self) -> AgentReport {
        debug!("starting agent actor");

        let mut terminated = false;

        loop {
            tokio::select! {
                biased;

                message = self.pipe_rx.recv() => {
                    let Some(message) = message else {
                        warn!("control pipe closed, shutting down");
                        break;
                    };

                    self.stats.commands_processed += 1;
                    let signal = self.interpreter.process(&mut self.connection, message).await;

                    if signal == Signal::Terminate {
                        terminated = true;
                        break;
                    }
                }

                Some(message) = self.connection.recv() => {
                    self.stats.messages_handled += 1;
                    self.handler.handle(message).await;
                }
            }
        }

        let report = AgentReport {
            state: self.connection.state().clone(),
            stats: self.stats.clone(),
            interpreter: self.interpreter.stats().clone(),
            terminated,
        };

        self.connection.disconnect().await;
        debug!("agent actor stopped");

        report
    }
}

/// Handle for sending control messages to an AgentActor
///
/// Clones share the same pipe. The agent stops once all clones are dropped.
#[derive(Clone)]
pub struct AgentHandle {
    /// Control pipe sender
    sender: mpsc::Sender<ControlMessage>,

    /// Agent name
    pub name: String,
}

impl AgentHandle {
    /// Spawn an agent with the default interpreter and a tracing-only handler
    pub fn spawn(name: impl Into<String>, network: Network) -> (Self, JoinHandle<AgentReport>) {
        Self::spawn_with(
            name,
            network,
            CommandInterpreter::new(),
            Box::new(LoggingHandler),
        )
    }

    /// Spawn an agent with an explicit interpreter and message handler
    pub fn spawn_with(
        name: impl Into<String>,
        network: Network,
        interpreter: CommandInterpreter,
        handler: Box<dyn MessageHandler>,
    ) -> (Self, JoinHandle<AgentReport>) {
        let name = name.into();
        let (pipe_tx, pipe_rx) = mpsc::channel(PIPE_SIZE);

        let actor = AgentActor::new(
            name.clone(),
            interpreter,
            BrokerClient::new(network),
            pipe_rx,
            handler,
        );
        let task = tokio::spawn(actor.run());

        (
            Self {
                sender: pipe_tx,
                name,
            },
            task,
        )
    }

    /// Send a raw control message
    pub async fn send(&self, message: ControlMessage) -> Result<()> {
        self.sender
            .send(message)
            .await
            .context("agent control pipe closed")
    }

    /// Send a control message built from `frames`
    pub async fn command<I, S>(&self, frames: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(ControlMessage::from_frames(frames)).await
    }

    /// Ask the agent to stop
    pub async fn terminate(&self) -> Result<()> {
        self.send(Command::Terminate.into_message()).await
    }
}
