//! Endpoint namespace for in-process brokers
//!
//! A `Network` maps endpoint strings (`ipc://...`, `inproc://...`,
//! `tcp://...`) to running brokers. Brokers bind endpoints, clients resolve
//! them. Resolving waits for a bind, so a client may start connecting before
//! its broker is up. A broker that has shut down counts as unbound, and its
//! endpoint can be bound again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::actors::broker::BrokerHandle;

use super::error::{BusError, BusResult};

/// Endpoint schemes a network accepts
const SCHEMES: [&str; 3] = ["ipc", "inproc", "tcp"];

/// Shared endpoint registry
///
/// Clones share the same registry.
#[derive(Clone)]
pub struct Network {
    endpoints: Arc<watch::Sender<HashMap<String, BrokerHandle>>>,
}

impl Network {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(HashMap::new());
        Self {
            endpoints: Arc::new(tx),
        }
    }

    /// Make `broker` reachable at `endpoint`
    pub fn bind(&self, endpoint: &str, broker: BrokerHandle) -> BusResult<()> {
        validate_endpoint(endpoint)?;

        let mut result = Ok(());
        self.endpoints.send_if_modified(|endpoints| {
            if live(endpoints, endpoint).is_some() {
                result = Err(BusError::AddressInUse(endpoint.to_string()));
                return false;
            }
            endpoints.insert(endpoint.to_string(), broker);
            true
        });

        if result.is_ok() {
            debug!("bound endpoint '{endpoint}'");
        }
        result
    }

    /// Remove the binding at `endpoint`, returning the broker that held it
    pub fn unbind(&self, endpoint: &str) -> Option<BrokerHandle> {
        let mut removed = None;
        self.endpoints.send_if_modified(|endpoints| {
            removed = endpoints.remove(endpoint);
            removed.is_some()
        });

        if removed.is_some() {
            debug!("unbound endpoint '{endpoint}'");
        }
        removed
    }

    /// Find the broker at `endpoint`, waiting up to `timeout` for it to be bound
    pub async fn resolve(&self, endpoint: &str, timeout: Duration) -> BusResult<BrokerHandle> {
        validate_endpoint(endpoint)?;

        let mut rx = self.endpoints.subscribe();
        let wait = rx.wait_for(|endpoints| live(endpoints, endpoint).is_some());

        match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(endpoints)) => {
                trace!("resolved endpoint '{endpoint}'");
                live(&endpoints, endpoint)
                    .cloned()
                    .ok_or(BusError::BrokerUnavailable)
            }
            // The sender lives as long as `self`, so this arm only covers the
            // registry being torn down mid-wait.
            Ok(Err(_)) => Err(BusError::BrokerUnavailable),
            Err(_) => Err(BusError::Timeout {
                endpoint: endpoint.to_string(),
                timeout,
            }),
        }
    }

    /// Is anything bound at `endpoint` right now?
    pub fn is_bound(&self, endpoint: &str) -> bool {
        live(&self.endpoints.borrow(), endpoint).is_some()
    }
}

/// The broker at `endpoint`, if it is still running
fn live<'a>(
    endpoints: &'a HashMap<String, BrokerHandle>,
    endpoint: &str,
) -> Option<&'a BrokerHandle> {
    endpoints.get(endpoint).filter(|broker| !broker.is_closed())
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that `endpoint` has the form `scheme://address`
pub fn validate_endpoint(endpoint: &str) -> BusResult<()> {
    match endpoint.split_once("://") {
        Some((scheme, address)) if SCHEMES.contains(&scheme) && !address.is_empty() => Ok(()),
        _ => Err(BusError::InvalidEndpoint(endpoint.to_string())),
    }
}
