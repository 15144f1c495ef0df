use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use tracing::warn;

use super::StreamCompletion;
use crate::StreamContext;
use crate::StreamStatus;

/// One not-yet-complete incoming file: the rewritten context plus the
/// status that will carry its verdict.
#[derive(Clone, Debug)]
pub struct PendingStream {
    pub context: StreamContext,
    pub status: StreamStatus,
}

/// Newcomer-side registry of outstanding files per source host, keyed
/// by the file name the *source* uses on the wire. A host is done when
/// its set drains; the registered completion capability fires once per
/// finished file.
pub struct StreamContextManager {
    hosts: DashMap<String, HostStreams>,
}

struct HostStreams {
    pending: HashMap<String, PendingStream>,
    handler: Option<Arc<dyn StreamCompletion>>,
}

impl StreamContextManager {
    pub fn new() -> Self {
        Self {
            hosts: DashMap::new(),
        }
    }

    pub fn add_stream_context(
        &self,
        host: &str,
        source_file: &str,
        context: StreamContext,
        status: StreamStatus,
    ) {
        debug!(%host, %source_file, local = %context.target_file, "adding stream context");
        let mut entry = self.hosts.entry(host.to_string()).or_insert_with(|| HostStreams {
            pending: HashMap::new(),
            handler: None,
        });
        entry
            .pending
            .insert(source_file.to_string(), PendingStream { context, status });
    }

    pub fn register_stream_completion_handler(
        &self,
        host: &str,
        handler: Arc<dyn StreamCompletion>,
    ) {
        let mut entry = self.hosts.entry(host.to_string()).or_insert_with(|| HostStreams {
            pending: HashMap::new(),
            handler: None,
        });
        entry.handler = Some(handler);
    }

    /// The rewritten local path for an in-flight file, if registered.
    pub fn local_path(
        &self,
        host: &str,
        source_file: &str,
    ) -> Option<String> {
        self.hosts
            .get(host)?
            .pending
            .get(source_file)
            .map(|p| p.context.target_file.clone())
    }

    /// Whether nothing is outstanding for `host`.
    pub fn is_done(
        &self,
        host: &str,
    ) -> bool {
        self.hosts.get(host).map(|e| e.pending.is_empty()).unwrap_or(true)
    }

    pub fn pending_count(
        &self,
        host: &str,
    ) -> usize {
        self.hosts.get(host).map(|e| e.pending.len()).unwrap_or(0)
    }

    /// Retire one file and fire the completion capability with the
    /// observed byte count. Unknown files are ignored with a warning;
    /// a re-streamed file re-enters via [`Self::add_stream_context`].
    pub async fn complete_file(
        &self,
        host: &str,
        source_file: &str,
        bytes_received: u64,
    ) {
        let (pending, handler) = {
            let mut entry = match self.hosts.get_mut(host) {
                Some(entry) => entry,
                None => {
                    warn!(%host, %source_file, "completion for unknown host");
                    return;
                }
            };
            let Some(mut pending) = entry.pending.remove(source_file) else {
                warn!(%host, %source_file, "completion for unknown file");
                return;
            };
            pending.status.bytes_received = bytes_received;
            (pending, entry.handler.clone())
        };

        match handler {
            Some(handler) => {
                if let Err(e) = handler
                    .on_stream_completion(host, pending.context, pending.status)
                    .await
                {
                    warn!(%host, %source_file, "completion handler failed: {e}");
                }
            }
            None => warn!(%host, %source_file, "no completion handler registered"),
        }

        // Drop drained hosts so long-lived nodes do not accumulate
        // entries across many peers.
        let drained = self
            .hosts
            .get(host)
            .map(|e| e.pending.is_empty())
            .unwrap_or(false);
        if drained {
            self.hosts.remove(host);
        }
    }
}

impl Default for StreamContextManager {
    fn default() -> Self {
        Self::new()
    }
}
