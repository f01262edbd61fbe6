//! Client side of the in-process bus
//!
//! `BrokerClient` is the connection an agent owns. It implements
//! [`BusConnection`] and keeps a [`ConnectionState`] that only changes when
//! the broker accepted the request.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::actors::broker::BrokerHandle;
use crate::actors::messages::{BusMessage, ClientId};

use super::connection::{BusConnection, ConnectionState, Subscription};
use super::error::{BusError, BusResult};
use super::network::{Network, validate_endpoint};

/// Capacity of a client's delivery inbox
const INBOX_SIZE: usize = 1024;

/// Live attachment to a broker
struct Link {
    broker: BrokerHandle,
    client: ClientId,
}

/// Connection to a broker on a [`Network`]
pub struct BrokerClient {
    network: Network,
    state: ConnectionState,
    link: Option<Link>,
    inbox: Option<mpsc::Receiver<BusMessage>>,
}

impl BrokerClient {
    /// Create an unconnected client on `network`
    pub fn new(network: Network) -> Self {
        Self {
            network,
            state: ConnectionState::default(),
            link: None,
            inbox: None,
        }
    }

    /// Current connection state
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Publish a message on the producer stream
    ///
    /// Returns the number of consumers the message reached.
    pub async fn send(&self, subject: &str, body: Vec<String>) -> BusResult<usize> {
        let link = self.link.as_ref().ok_or(BusError::NotConnected)?;
        link.broker.publish(link.client, subject, body).await
    }

    /// Wait for the next delivery
    ///
    /// Pending forever while unconnected. Returns `None` once when the broker
    /// drops the inbox; later calls pend until the next connect.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        let Some(inbox) = self.inbox.as_mut() else {
            return std::future::pending().await;
        };

        let message = inbox.recv().await;
        if message.is_none() {
            warn!("bus inbox closed by broker");
            self.inbox = None;
        }
        message
    }

    /// Detach from the broker and clear the state
    pub async fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            debug!("detaching from '{}'", link.broker.name);
            link.broker.detach(link.client).await;
        }
        self.inbox = None;
        self.state = ConnectionState::default();
    }
}

#[async_trait]
impl BusConnection for BrokerClient {
    async fn connect(
        &mut self,
        endpoint: &str,
        timeout: Duration,
        identity: &str,
    ) -> BusResult<()> {
        validate_endpoint(endpoint)?;

        trace!("resolving '{endpoint}' (timeout {}ms)", timeout.as_millis());
        let (deliver, inbox) = mpsc::channel(INBOX_SIZE);

        // One deadline covers finding the broker and being registered by it
        let network = &self.network;
        let attach = async {
            let broker = network.resolve(endpoint, timeout).await?;
            let client = broker.attach(identity, deliver).await?;
            Ok::<_, BusError>((broker, client))
        };
        let (broker, client) = tokio::time::timeout(timeout, attach)
            .await
            .map_err(|_| BusError::Timeout {
                endpoint: endpoint.to_string(),
                timeout,
            })??;

        // Producer and consumer belong to the old broker; the new one knows neither.
        self.disconnect().await;

        debug!("connected to '{endpoint}' as '{identity}' (#{client})");
        self.link = Some(Link { broker, client });
        self.inbox = Some(inbox);
        self.state.endpoint = Some(endpoint.to_string());
        self.state.identity = Some(identity.to_string());

        Ok(())
    }

    async fn set_producer(&mut self, stream: &str) -> BusResult<()> {
        let link = self.link.as_ref().ok_or(BusError::NotConnected)?;
        link.broker.set_producer(link.client, stream).await?;

        self.state.producer = Some(stream.to_string());
        Ok(())
    }

    async fn set_consumer(&mut self, stream: &str, pattern: &str) -> BusResult<()> {
        let link = self.link.as_ref().ok_or(BusError::NotConnected)?;
        link.broker.set_consumer(link.client, stream, pattern).await?;

        self.state.consumer = Some(Subscription {
            stream: stream.to_string(),
            pattern: pattern.to_string(),
        });
        Ok(())
    }
}

impl Drop for BrokerClient {
    fn drop(&mut self) {
        if let Some(link) = self.link.take() {
            link.broker.detach_nowait(link.client);
        }
    }
}
