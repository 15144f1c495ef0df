//! The membership surface bootstrap consumes: per-endpoint application
//! states and the load view derived from them.
//!
//! Dissemination itself (failure detection, state exchange rounds)
//! belongs to the membership service and stays outside this crate's
//! scope; peers' states enter through [`Gossiper::apply_remote_state`].

mod load_balancer;

pub use load_balancer::*;


use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::debug;

use crate::ring::Endpoint;

/// Cluster-visible key/value markers for the local node plus a cache
/// of every peer's published states. Remote entries keep first-seen
/// order, which the load balancer's tie-breaking relies on.
pub struct Gossiper {
    local: RwLock<HashMap<String, String>>,
    remote: RwLock<Vec<(Endpoint, HashMap<String, String>)>>,
    changed: Notify,
}

impl Gossiper {
    pub fn new() -> Self {
        Self {
            local: RwLock::new(HashMap::new()),
            remote: RwLock::new(Vec::new()),
            changed: Notify::new(),
        }
    }

    /// Publish a state key for the local node.
    pub fn add_application_state(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let key = key.into();
        debug!(%key, "publishing application state");
        self.local.write().unwrap().insert(key, value.into());
        self.changed.notify_waiters();
    }

    /// Retract a previously published state key.
    pub fn remove_application_state(
        &self,
        key: &str,
    ) {
        debug!(%key, "retracting application state");
        self.local.write().unwrap().remove(key);
        self.changed.notify_waiters();
    }

    pub fn local_application_state(
        &self,
        key: &str,
    ) -> Option<String> {
        self.local.read().unwrap().get(key).cloned()
    }

    /// Record a state key a peer published. Fed by the membership
    /// service's exchange rounds.
    pub fn apply_remote_state(
        &self,
        endpoint: Endpoint,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let mut remote = self.remote.write().unwrap();
        match remote.iter_mut().find(|(e, _)| *e == endpoint) {
            Some((_, states)) => {
                states.insert(key.into(), value.into());
            }
            None => {
                let mut states = HashMap::new();
                states.insert(key.into(), value.into());
                remote.push((endpoint, states));
            }
        }
        drop(remote);
        self.changed.notify_waiters();
    }

    /// Peers that published `key`, in first-seen order.
    pub fn endpoints_with_state(
        &self,
        key: &str,
    ) -> Vec<(Endpoint, String)> {
        self.remote
            .read()
            .unwrap()
            .iter()
            .filter_map(|(e, states)| states.get(key).map(|v| (e.clone(), v.clone())))
            .collect()
    }

    /// A future resolved on the next state change, for bounded waits.
    pub(crate) fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }
}

impl Default for Gossiper {
    fn default() -> Self {
        Self::new()
    }
}
