use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::BootstrapCompletionHandler;
use super::BootstrapContext;
use crate::constants::BOOTSTRAP_MODE;
use crate::network::VerbHandler;
use crate::ring::Endpoint;
use crate::ring::Range;
use crate::storage::SstableName;
use crate::BootstrapError;
use crate::BootstrapInitiateMessage;
use crate::BootstrapMetadataMessage;
use crate::Message;
use crate::Result;
use crate::StreamAction;
use crate::StreamStatus;
use crate::StreamStatusMessage;
use crate::Verb;

/// Source side: answer a newcomer's token request with the midpoint of
/// this node's data, so the newcomer assumes roughly half the load.
pub struct BootstrapTokenHandler {
    ctx: Arc<BootstrapContext>,
}

impl BootstrapTokenHandler {
    pub fn new(ctx: Arc<BootstrapContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl VerbHandler for BootstrapTokenHandler {
    async fn do_verb(
        &self,
        message: Message,
    ) -> Result<Option<Message>> {
        let snapshot = self.ctx.token_metadata.snapshot();
        let primary_range = snapshot.primary_range(&self.ctx.local).ok_or_else(|| {
            BootstrapError::TokenRequestFailed {
                endpoint: self.ctx.local.to_string(),
                detail: "node owns no token".to_string(),
            }
        })?;

        let splits = self.ctx.storage.get_splits(primary_range, 2)?;
        if splits.len() != 3 {
            return Err(BootstrapError::BadSplitCount {
                expected: 3,
                actual: splits.len(),
            }
            .into());
        }

        let token_str = self.ctx.partitioner.token_to_string(&splits[1]);
        debug!(token = %token_str, to = %message.from_endpoint(), "proposing split token");
        Ok(Some(message.reply(&self.ctx.local, Bytes::from(token_str))))
    }
}

/// Source side: a newcomer told us which ranges we owe it. Open the
/// covering files, remember them in the per-target stream manager, and
/// announce them with a `BootstrapInitiate`.
pub struct BootstrapMetadataHandler {
    ctx: Arc<BootstrapContext>,
}

impl BootstrapMetadataHandler {
    pub fn new(ctx: Arc<BootstrapContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl VerbHandler for BootstrapMetadataHandler {
    async fn do_verb(
        &self,
        message: Message,
    ) -> Result<Option<Message>> {
        let metadata: BootstrapMetadataMessage = message.decode_body()?;
        let target = Endpoint::new(metadata.target_host.clone(), metadata.target_port as u16);

        let mut ranges = Vec::with_capacity(metadata.ranges.len());
        for r in &metadata.ranges {
            let range = Range::new(
                self.ctx.partitioner.token_from_string(&r.left)?,
                self.ctx.partitioner.token_from_string(&r.right)?,
            );
            // Planned ranges always carry a newcomer boundary, so
            // equal endpoints can only mean a corrupted request.
            if range.left == range.right {
                return Err(BootstrapError::DegenerateRange(range.left.to_string()).into());
            }
            ranges.push(range);
        }
        info!(%target, ranges = ranges.len(), "peer requests bootstrap data");

        let manager = self.ctx.stream_managers.get_or_create(&target);
        let mut contexts = Vec::new();
        for (table, path) in self.ctx.storage.files_for_ranges(&ranges) {
            let expected_bytes = tokio::fs::metadata(&path)
                .await
                .map(|m| m.len())
                .unwrap_or_else(|e| {
                    warn!(path = %path.display(), "cannot stat file, skipping: {e}");
                    0
                });
            if expected_bytes == 0 && !path.exists() {
                continue;
            }

            manager.add_file(path.clone(), expected_bytes);
            contexts.push(crate::StreamContext {
                table,
                target_file: path.display().to_string(),
                expected_bytes,
            });
        }

        let initiate = BootstrapInitiateMessage { contexts };
        debug!(%target, files = initiate.contexts.len(), "sending bootstrap initiate");
        let reply = Message::new(
            Verb::BootstrapInitiate,
            &self.ctx.local,
            Message::encode_body(&initiate),
        );
        self.ctx.transport.send_one_way(reply, &target).await?;
        Ok(None)
    }
}

/// Newcomer side: a source announced the files it is about to ship.
/// Allocate fresh local names, register the transfers, and ack that
/// streaming may begin.
pub struct BootstrapInitiateHandler {
    ctx: Arc<BootstrapContext>,
}

impl BootstrapInitiateHandler {
    pub fn new(ctx: Arc<BootstrapContext>) -> Self {
        Self { ctx }
    }

    /// One generated name per distinct `(table, cf, generation)`; all
    /// component kinds of one incoming table share it.
    fn new_names(
        &self,
        contexts: &[crate::StreamContext],
    ) -> Result<HashMap<String, SstableName>> {
        let mut names = HashMap::new();
        for context in contexts {
            let source_name = file_name_of(&context.target_file)?;
            let parsed = SstableName::parse(&source_name)?;
            let key = format!("{}-{}", context.table, parsed.stem());
            if names.contains_key(&key) {
                continue;
            }

            let store = self
                .ctx
                .storage
                .column_family_store(&context.table, &parsed.column_family);
            let generated = SstableName::parse(&store.temp_sstable_file_name())?;
            debug!(%key, new_stem = %generated.stem(), "generated local sstable name");
            names.insert(key, generated);
        }
        Ok(names)
    }
}

#[async_trait]
impl VerbHandler for BootstrapInitiateHandler {
    async fn do_verb(
        &self,
        message: Message,
    ) -> Result<Option<Message>> {
        let from = message.from_endpoint();
        let initiate: BootstrapInitiateMessage = message.decode_body()?;
        info!(%from, files = initiate.contexts.len(), "received bootstrap initiate");

        let names = self.new_names(&initiate.contexts)?;
        for mut context in initiate.contexts.clone() {
            let source_file = context.target_file.clone();
            let source_name = file_name_of(&source_file)?;
            let parsed = SstableName::parse(&source_name)?;

            let generated = &names[&format!("{}-{}", context.table, parsed.stem())];
            let local_name = generated.with_kind(&parsed.kind).format();
            let local_path = self
                .ctx
                .storage
                .data_file_location(&context.table)
                .join(local_name);

            debug!(%from, from_file = %source_file, to_file = %local_path.display(), "receiving data");
            context.target_file = local_path.display().to_string();

            let status = StreamStatus::new(source_file.clone(), context.expected_bytes);
            self.ctx
                .stream_contexts
                .add_stream_context(&from.host, &source_file, context, status);
        }

        self.ctx.stream_contexts.register_stream_completion_handler(
            &from.host,
            Arc::new(BootstrapCompletionHandler::new(&self.ctx)),
        );

        debug!(%from, "sending bootstrap initiate done");
        let done = Message::new(Verb::BootstrapInitiateDone, &self.ctx.local, Bytes::new());
        self.ctx.transport.send_one_way(done, &from).await?;

        // A source with nothing to ship is already done.
        if initiate.contexts.is_empty() {
            let remaining = self.ctx.storage.remove_bootstrap_source(&from);
            if remaining == 0 {
                info!("bootstrap complete, leaving bootstrap mode");
                self.ctx.gossiper.remove_application_state(BOOTSTRAP_MODE);
            }
        }
        Ok(None)
    }
}

/// Source side: the newcomer is ready; let the stream manager push.
pub struct BootstrapInitiateDoneHandler {
    ctx: Arc<BootstrapContext>,
}

impl BootstrapInitiateDoneHandler {
    pub fn new(ctx: Arc<BootstrapContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl VerbHandler for BootstrapInitiateDoneHandler {
    async fn do_verb(
        &self,
        message: Message,
    ) -> Result<Option<Message>> {
        let from = message.from_endpoint();
        debug!(%from, "received bootstrap initiate done");

        match self.ctx.stream_managers.get(&from) {
            Some(manager) => {
                tokio::spawn(async move { manager.start().await });
            }
            None => warn!(%from, "initiate done from peer with no pending stream"),
        }
        Ok(None)
    }
}

/// Source side: per-file verdict. `Delete` frees the slot, `Stream`
/// re-sends, anything else is a no-op.
pub struct BootstrapTerminateHandler {
    ctx: Arc<BootstrapContext>,
}

impl BootstrapTerminateHandler {
    pub fn new(ctx: Arc<BootstrapContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl VerbHandler for BootstrapTerminateHandler {
    async fn do_verb(
        &self,
        message: Message,
    ) -> Result<Option<Message>> {
        let from = message.from_endpoint();
        let status_message: StreamStatusMessage = message.decode_body()?;
        let Some(status) = status_message.status else {
            warn!(%from, "terminate without status");
            return Ok(None);
        };

        let Some(manager) = self.ctx.stream_managers.get(&from) else {
            warn!(%from, "terminate from peer with no pending stream");
            return Ok(None);
        };

        match status.action() {
            StreamAction::Delete => manager.finish(&status.file),
            StreamAction::Stream => {
                debug!(file = %status.file, "peer requests re-stream");
                let file = status.file.clone();
                tokio::spawn(async move { manager.repeat(&file).await });
            }
            StreamAction::Unspecified => {}
        }
        Ok(None)
    }
}

fn file_name_of(path: &str) -> Result<String> {
    std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| crate::StorageError::BadFileName(path.to_string()).into())
}
