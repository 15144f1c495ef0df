use std::path::Path;
use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::BootstrapContext;
use crate::constants::BOOTSTRAP_MODE;
use crate::constants::DATA_SUFFIX;
use crate::ring::Endpoint;
use crate::storage::SstableName;
use crate::storage::SstableWriter;
use crate::streaming::StreamCompletion;
use crate::Message;
use crate::Result;
use crate::StreamAction;
use crate::StreamContext;
use crate::StreamStatus;
use crate::StreamStatusMessage;
use crate::Verb;

/// Invoked when one file from one source host has fully arrived.
///
/// Data components get installed into their column-family store; every
/// file earns a per-file verdict sent back as `BootstrapTerminate`. A
/// failed install never aborts the bootstrap; the verdict channel
/// re-requests the file instead. When the last outstanding file of the
/// last source drains, bootstrap mode is retracted.
///
/// Holds its context weakly: the context owns the stream bookkeeping
/// that owns this handler.
pub struct BootstrapCompletionHandler {
    ctx: Weak<BootstrapContext>,
}

impl BootstrapCompletionHandler {
    pub fn new(ctx: &Arc<BootstrapContext>) -> Self {
        Self {
            ctx: Arc::downgrade(ctx),
        }
    }

    /// Promote the received component; Data components additionally
    /// open and install. Returns false when the file is unusable.
    async fn install(
        ctx: &BootstrapContext,
        context: &StreamContext,
    ) -> bool {
        let path = Path::new(&context.target_file);
        let file_name = match path.file_name().map(|n| n.to_string_lossy().into_owned()) {
            Some(name) => name,
            None => return false,
        };

        if file_name.ends_with(DATA_SUFFIX) {
            match SstableWriter::rename_and_open(path).await {
                Ok(reader) => {
                    let parsed = match SstableName::parse(&reader.file_name()) {
                        Ok(parsed) => parsed,
                        Err(e) => {
                            error!(file = %reader.file_name(), "unparseable installed name: {e}");
                            return false;
                        }
                    };
                    let store = ctx
                        .storage
                        .column_family_store(&context.table, &parsed.column_family);
                    let file = reader.file_name();
                    store.add_sstable(Arc::new(reader));
                    info!(%file, "bootstrap added sstable");
                    true
                }
                Err(e) => {
                    error!(file = %context.target_file, "not able to bootstrap with file: {e}");
                    // Do not leave the unusable temp component behind.
                    if let Err(e) = tokio::fs::remove_file(path).await {
                        debug!(path = %path.display(), "temp cleanup failed: {e}");
                    }
                    false
                }
            }
        } else {
            match SstableWriter::promote_component(path).await {
                Ok(_) => true,
                Err(e) => {
                    error!(file = %context.target_file, "failed to promote component: {e}");
                    false
                }
            }
        }
    }
}

#[async_trait]
impl StreamCompletion for BootstrapCompletionHandler {
    async fn on_stream_completion(
        &self,
        host: &str,
        context: StreamContext,
        mut status: StreamStatus,
    ) -> Result<()> {
        let Some(ctx) = self.ctx.upgrade() else {
            return Ok(());
        };

        let intact = status.bytes_received == status.expected_bytes;
        let installed = if intact {
            Self::install(&ctx, &context).await
        } else {
            warn!(
                file = %status.file,
                received = status.bytes_received,
                expected = status.expected_bytes,
                "incomplete file"
            );
            false
        };

        status.set_action(if installed && intact {
            StreamAction::Delete
        } else {
            StreamAction::Stream
        });

        if status.action() == StreamAction::Stream {
            // The file will be sent again; track it anew under the
            // source's name so the retry has somewhere to land.
            ctx.stream_contexts.add_stream_context(
                host,
                &status.file,
                context.clone(),
                StreamStatus::new(status.file.clone(), status.expected_bytes),
            );
        }

        let source = Endpoint::new(host, ctx.config.cluster.storage_port);
        debug!(%source, file = %status.file, action = ?status.action(), "sending bootstrap terminate");
        let terminate = Message::new(
            Verb::BootstrapTerminate,
            &ctx.local,
            Message::encode_body(&StreamStatusMessage {
                status: Some(status),
            }),
        );
        if let Err(e) = ctx.transport.send_one_way(terminate, &source).await {
            warn!(%source, "failed to send terminate: {e}");
        }

        if ctx.stream_contexts.is_done(host) {
            let remaining = ctx.storage.remove_bootstrap_source(&source);
            info!(%source, remaining, "bootstrap source drained");
            if remaining == 0 {
                info!("bootstrap complete, leaving bootstrap mode");
                ctx.gossiper.remove_application_state(BOOTSTRAP_MODE);
            }
        }
        Ok(())
    }
}
