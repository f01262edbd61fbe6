//! BrokerActor - In-process publish/subscribe broker
//!
//! The broker owns every client registration and routes published messages
//! to consumer inboxes. Clients never talk to each other directly.
//!
//! ## Message Flow
//!
//! ```text
//! Client publish → Broker (producer stream) → match subscriptions → consumer inboxes
//!                     ↑
//!                     └─── Commands (Attach, SetProducer, SetConsumer, Publish, ...)
//! ```
//!
//! ## Routing
//!
//! A message published on stream `S` with subject `x` is delivered to every
//! client whose subscription stream is `S` and whose pattern matches `x`.
//! Each matching client gets the message once.

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::Utc;
use regex::Regex;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, trace, warn};

use crate::bus::{BusError, BusResult, Network};

use super::messages::{BrokerCommand, BrokerStats, BusMessage, ClientId};

/// Capacity of the broker command channel
const COMMAND_CHANNEL_SIZE: usize = 256;

/// A client subscription with its compiled pattern
struct CompiledSubscription {
    stream: String,
    pattern: Regex,
}

/// Broker-side view of an attached client
struct ClientEntry {
    identity: String,
    deliver: mpsc::Sender<BusMessage>,
    producer: Option<String>,
    consumer: Option<CompiledSubscription>,
}

/// Actor that routes messages between attached clients
pub struct BrokerActor {
    /// Broker name for logging
    name: String,

    /// Command receiver
    command_rx: mpsc::Receiver<BrokerCommand>,

    /// Attached clients
    clients: HashMap<ClientId, ClientEntry>,

    /// Next client id to hand out
    next_client: ClientId,

    /// Successful deliveries
    messages_routed: u64,

    /// Deliveries lost to full inboxes
    messages_dropped: u64,
}

impl BrokerActor {
    /// Create a new broker actor
    pub fn new(name: impl Into<String>, command_rx: mpsc::Receiver<BrokerCommand>) -> Self {
        Self {
            name: name.into(),
            command_rx,
            clients: HashMap::new(),
            next_client: 1,
            messages_routed: 0,
            messages_dropped: 0,
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or every handle is dropped.
    #[instrument(skip(self), fields(broker = %self.name))]
    pub async fn run(mut self) {
        debug!("starting broker actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                BrokerCommand::Attach {
                    identity,
                    deliver,
                    respond_to,
                } => {
                    let id = self.attach(identity, deliver);
                    let _ = respond_to.send(id);
                }

                BrokerCommand::Detach { client } => {
                    if let Some(entry) = self.clients.remove(&client) {
                        debug!("client '{}' (#{client}) detached", entry.identity);
                    }
                }

                BrokerCommand::SetProducer {
                    client,
                    stream,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.set_producer(client, stream));
                }

                BrokerCommand::SetConsumer {
                    client,
                    stream,
                    pattern,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.set_consumer(client, stream, &pattern));
                }

                BrokerCommand::Publish {
                    client,
                    subject,
                    body,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.publish(client, subject, body));
                }

                BrokerCommand::GetStats { respond_to } => {
                    let _ = respond_to.send(self.stats());
                }

                BrokerCommand::Shutdown { respond_to } => {
                    debug!("received shutdown command");
                    // Handles see the broker as closed from here on
                    self.command_rx.close();
                    let _ = respond_to.send(());
                    break;
                }
            }
        }

        debug!("broker actor stopped");
    }

    fn attach(&mut self, identity: String, deliver: mpsc::Sender<BusMessage>) -> ClientId {
        let id = self.next_client;
        self.next_client += 1;

        debug!("client '{identity}' attached as #{id}");

        self.clients.insert(
            id,
            ClientEntry {
                identity,
                deliver,
                producer: None,
                consumer: None,
            },
        );

        id
    }

    fn client_mut(&mut self, client: ClientId) -> BusResult<&mut ClientEntry> {
        self.clients
            .get_mut(&client)
            .ok_or(BusError::NotConnected)
    }

    fn set_producer(&mut self, client: ClientId, stream: String) -> BusResult<()> {
        validate_stream(&stream)?;

        let entry = self.client_mut(client)?;
        debug!("client '{}' produces on '{stream}'", entry.identity);
        entry.producer = Some(stream);

        Ok(())
    }

    fn set_consumer(&mut self, client: ClientId, stream: String, pattern: &str) -> BusResult<()> {
        validate_stream(&stream)?;

        let compiled = Regex::new(pattern).map_err(|e| BusError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let entry = self.client_mut(client)?;
        debug!(
            "client '{}' consumes '{stream}' matching '{pattern}'",
            entry.identity
        );
        entry.consumer = Some(CompiledSubscription {
            stream,
            pattern: compiled,
        });

        Ok(())
    }

    /// Forget clients whose inbox was dropped without a detach
    fn prune_closed(&mut self) {
        self.clients.retain(|id, entry| {
            let open = !entry.deliver.is_closed();
            if !open {
                debug!("client '{}' (#{id}) inbox closed, removing", entry.identity);
            }
            open
        });
    }

    /// Route a message, returning the number of inboxes it reached
    fn publish(&mut self, client: ClientId, subject: String, body: Vec<String>) -> BusResult<usize> {
        self.prune_closed();

        let entry = self.clients.get(&client).ok_or(BusError::NotConnected)?;
        let stream = entry.producer.clone().ok_or(BusError::NoProducer)?;

        let message = BusMessage {
            stream,
            sender: entry.identity.clone(),
            subject,
            body,
            timestamp: Utc::now(),
        };

        let mut delivered = 0;

        for (id, target) in &self.clients {
            let Some(subscription) = &target.consumer else {
                continue;
            };

            if subscription.stream != message.stream
                || !subscription.pattern.is_match(&message.subject)
            {
                continue;
            }

            match target.deliver.try_send(message.clone()) {
                Ok(()) => {
                    delivered += 1;
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "inbox of client '{}' (#{id}) is full, dropping message",
                        target.identity
                    );
                    self.messages_dropped += 1;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    trace!("inbox of client #{id} closed mid-publish");
                }
            }
        }

        self.messages_routed += delivered as u64;
        trace!(
            "routed '{}' on '{}' to {delivered} consumers",
            message.subject, message.stream
        );

        Ok(delivered)
    }

    fn stats(&mut self) -> BrokerStats {
        self.prune_closed();

        BrokerStats {
            clients: self.clients.len(),
            producers: self.clients.values().filter(|c| c.producer.is_some()).count(),
            consumers: self.clients.values().filter(|c| c.consumer.is_some()).count(),
            messages_routed: self.messages_routed,
            messages_dropped: self.messages_dropped,
        }
    }
}

fn validate_stream(stream: &str) -> BusResult<()> {
    if stream.is_empty() || stream.chars().any(char::is_whitespace) {
        return Err(BusError::InvalidStream(stream.to_string()));
    }
    Ok(())
}

/// Handle for controlling a BrokerActor
///
/// Cheap to clone; every clone talks to the same broker task.
#[derive(Clone, Debug)]
pub struct BrokerHandle {
    /// Command sender
    sender: mpsc::Sender<BrokerCommand>,

    /// Broker name
    pub name: String,
}

impl BrokerHandle {
    /// Spawn a new broker actor
    pub fn spawn(name: impl Into<String>) -> Self {
        let name = name.into();
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        let actor = BrokerActor::new(name.clone(), cmd_rx);
        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            name,
        }
    }

    /// Spawn a broker and bind it at `endpoint` on `network`
    pub fn spawn_bound(name: impl Into<String>, network: &Network, endpoint: &str) -> BusResult<Self> {
        let handle = Self::spawn(name);
        network.bind(endpoint, handle.clone())?;
        Ok(handle)
    }

    /// Register a client; deliveries for it go to `deliver`
    pub async fn attach(
        &self,
        identity: &str,
        deliver: mpsc::Sender<BusMessage>,
    ) -> BusResult<ClientId> {
        let (tx, rx) = oneshot::channel();
        self.request(BrokerCommand::Attach {
            identity: identity.to_string(),
            deliver,
            respond_to: tx,
        })
        .await?;

        rx.await.map_err(|_| BusError::BrokerUnavailable)
    }

    /// Forget a client
    pub async fn detach(&self, client: ClientId) {
        if self
            .sender
            .send(BrokerCommand::Detach { client })
            .await
            .is_err()
        {
            trace!("broker gone, detach of #{client} skipped");
        }
    }

    /// Forget a client without waiting, for use from `Drop`
    ///
    /// A full command queue hands the detach to a spawned task. Outside a
    /// runtime it is left to the broker, which drops clients whose inbox is
    /// closed.
    pub fn detach_nowait(&self, client: ClientId) {
        match self.sender.try_send(BrokerCommand::Detach { client }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(cmd)) => {
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        let sender = self.sender.clone();
                        runtime.spawn(async move {
                            let _ = sender.send(cmd).await;
                        });
                    }
                    Err(_) => trace!("no runtime, detach of #{client} left to the broker"),
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                trace!("broker gone, detach of #{client} skipped");
            }
        }
    }

    pub async fn set_producer(&self, client: ClientId, stream: &str) -> BusResult<()> {
        let (tx, rx) = oneshot::channel();
        self.request(BrokerCommand::SetProducer {
            client,
            stream: stream.to_string(),
            respond_to: tx,
        })
        .await?;

        rx.await.map_err(|_| BusError::BrokerUnavailable)?
    }

    pub async fn set_consumer(&self, client: ClientId, stream: &str, pattern: &str) -> BusResult<()> {
        let (tx, rx) = oneshot::channel();
        self.request(BrokerCommand::SetConsumer {
            client,
            stream: stream.to_string(),
            pattern: pattern.to_string(),
            respond_to: tx,
        })
        .await?;

        rx.await.map_err(|_| BusError::BrokerUnavailable)?
    }

    /// Publish on the client's producer stream, returning the number of deliveries
    pub async fn publish(
        &self,
        client: ClientId,
        subject: &str,
        body: Vec<String>,
    ) -> BusResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.request(BrokerCommand::Publish {
            client,
            subject: subject.to_string(),
            body,
            respond_to: tx,
        })
        .await?;

        rx.await.map_err(|_| BusError::BrokerUnavailable)?
    }

    /// Get broker statistics
    pub async fn get_stats(&self) -> Result<BrokerStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(BrokerCommand::GetStats { respond_to: tx })
            .await
            .context("failed to send GetStats command")?;

        rx.await.context("failed to receive stats")
    }

    /// Gracefully shut down the broker
    ///
    /// Returns once the broker stopped taking commands.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(BrokerCommand::Shutdown { respond_to: tx })
            .await
            .context("failed to send Shutdown command")?;

        rx.await.context("broker stopped before acknowledging shutdown")
    }

    /// Has the broker stopped taking commands?
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// A handle whose broker never answers, plus the queue it writes to
    #[cfg(test)]
    pub(crate) fn stalled(name: &str) -> (Self, mpsc::Receiver<BrokerCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        (
            Self {
                sender: cmd_tx,
                name: name.to_string(),
            },
            cmd_rx,
        )
    }

    async fn request(&self, cmd: BrokerCommand) -> BusResult<()> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| BusError::BrokerUnavailable)
    }
}
