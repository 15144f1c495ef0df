//! The messaging layer: point-to-point envelopes, a verb dispatch
//! table and a TCP transport.
//!
//! Handlers never terminate the process: dispatch logs failures and
//! moves on. Recovery for lost or failed steps lives at the protocol
//! layer (per-file verdicts, bounded request deadlines).

mod tcp;

pub use tcp::*;


use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
#[cfg(test)]
use mockall::automock;
use tracing::info;
use tracing::warn;

use crate::ring::Endpoint;
use crate::Message;
use crate::Result;
use crate::Verb;

/// Point-to-point sends. `send_request` carries a bounded deadline
/// supplied by the implementation's configuration; there are no
/// unbounded waits in this layer.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `message` and await the correlated reply frame.
    async fn send_request(
        &self,
        message: Message,
        to: &Endpoint,
    ) -> Result<Message>;

    /// Fire-and-forget. Loss is undetectable here; recovery belongs to
    /// the per-file verdict channel.
    async fn send_one_way(
        &self,
        message: Message,
        to: &Endpoint,
    ) -> Result<()>;
}

/// A handler invoked when its verb arrives. Returning `Some(reply)`
/// answers a request/response exchange on the same connection;
/// one-way verbs return `None` and reply (if at all) with their own
/// one-way sends.
#[async_trait]
pub trait VerbHandler: Send + Sync + 'static {
    async fn do_verb(
        &self,
        message: Message,
    ) -> Result<Option<Message>>;
}

/// The verb dispatch table. Adding a verb means registering here;
/// there is no handler hierarchy.
pub struct MessagingService {
    handlers: DashMap<i32, Arc<dyn VerbHandler>>,
}

impl MessagingService {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    pub fn register_verb_handler(
        &self,
        verb: Verb,
        handler: Arc<dyn VerbHandler>,
    ) {
        self.handlers.insert(verb.into(), handler);
    }

    /// Route `message` to its handler. Handler failures are logged and
    /// swallowed; the caller only sees a reply frame or nothing.
    pub async fn dispatch(
        &self,
        message: Message,
    ) -> Option<Message> {
        let verb = message.verb();
        let handler = match self.handlers.get(&message.verb) {
            Some(entry) => entry.value().clone(),
            None => {
                warn!(
                    from = %message.from_endpoint(),
                    "{}",
                    crate::NetworkError::UnknownVerb(message.verb)
                );
                return None;
            }
        };

        match handler.do_verb(message).await {
            Ok(reply) => reply,
            Err(e) => {
                info!(?verb, "verb handler failed: {e}");
                None
            }
        }
    }
}

impl Default for MessagingService {
    fn default() -> Self {
        Self::new()
    }
}
