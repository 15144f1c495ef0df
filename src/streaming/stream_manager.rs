use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::network::Transport;
use crate::ring::Endpoint;
use crate::FileChunk;
use crate::Message;
use crate::Result;
use crate::StorageError;
use crate::Verb;

/// One file the source still owes a target.
#[derive(Clone, Debug)]
pub struct PendingTransfer {
    pub path: PathBuf,
    pub expected_bytes: u64,
}

/// Source-side ledger for one target endpoint: which files are still
/// unacknowledged, and the machinery to push their bytes.
///
/// `start` runs once the target has said it is ready. The set only
/// shrinks through per-file `Delete` verdicts; a `Stream` verdict
/// re-sends a file without re-adding it.
pub struct StreamManager {
    local: Endpoint,
    target: Endpoint,
    transport: Arc<dyn Transport>,
    chunk_bytes: usize,
    files: Mutex<BTreeMap<String, PendingTransfer>>,
}

impl StreamManager {
    pub fn new(
        local: Endpoint,
        target: Endpoint,
        transport: Arc<dyn Transport>,
        chunk_bytes: usize,
    ) -> Self {
        Self {
            local,
            target,
            transport,
            chunk_bytes,
            files: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn add_file(
        &self,
        path: PathBuf,
        expected_bytes: u64,
    ) {
        let key = path.display().to_string();
        self.files.lock().unwrap().insert(
            key,
            PendingTransfer {
                path,
                expected_bytes,
            },
        );
    }

    pub fn pending_files(&self) -> Vec<(String, u64)> {
        self.files
            .lock()
            .unwrap()
            .iter()
            .map(|(k, t)| (k.clone(), t.expected_bytes))
            .collect()
    }

    pub fn is_done(&self) -> bool {
        self.files.lock().unwrap().is_empty()
    }

    /// Push every pending file to the target. Files go out one at a
    /// time; per-file failures are logged and left pending so the
    /// target's verdict channel can request them again.
    pub async fn start(&self) {
        let snapshot: Vec<(String, PendingTransfer)> = self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(k, t)| (k.clone(), t.clone()))
            .collect();

        info!(target = %self.target, files = snapshot.len(), "starting file stream");
        for (key, transfer) in snapshot {
            if let Err(e) = self.stream_file(&key, &transfer).await {
                warn!(target = %self.target, file = %key, "streaming failed: {e}");
            }
        }
    }

    /// Acknowledge one delivered file and free its slot.
    pub fn finish(
        &self,
        file: &str,
    ) {
        let mut files = self.files.lock().unwrap();
        if files.remove(file).is_none() {
            warn!(target = %self.target, %file, "finish for unknown file");
            return;
        }
        if files.is_empty() {
            info!(target = %self.target, "all files acknowledged");
        }
    }

    /// Re-send one file the target reported as unusable.
    pub async fn repeat(
        &self,
        file: &str,
    ) {
        let transfer = self.files.lock().unwrap().get(file).cloned();
        match transfer {
            Some(transfer) => {
                debug!(target = %self.target, %file, "re-streaming file");
                if let Err(e) = self.stream_file(file, &transfer).await {
                    warn!(target = %self.target, %file, "re-streaming failed: {e}");
                }
            }
            None => warn!(target = %self.target, %file, "repeat for unknown file"),
        }
    }

    async fn stream_file(
        &self,
        key: &str,
        transfer: &PendingTransfer,
    ) -> Result<()> {
        let mut file = File::open(&transfer.path).await.map_err(|e| {
            StorageError::PathError {
                path: transfer.path.clone(),
                source: e,
            }
        })?;

        let mut hasher = crc32fast::Hasher::new();
        let mut offset = 0u64;
        let mut buf = vec![0u8; self.chunk_bytes];

        loop {
            let n = file.read(&mut buf).await.map_err(StorageError::IoError)?;
            let eof = n == 0 || offset + n as u64 >= transfer.expected_bytes;
            hasher.update(&buf[..n]);

            let chunk = FileChunk {
                file: key.to_string(),
                offset,
                data: Bytes::copy_from_slice(&buf[..n]),
                eof,
                crc: if eof { hasher.clone().finalize() } else { 0 },
            };
            let message =
                Message::new(Verb::StreamChunk, &self.local, Message::encode_body(&chunk));
            self.transport.send_one_way(message, &self.target).await?;

            offset += n as u64;
            if eof {
                break;
            }
        }

        debug!(target = %self.target, file = %key, bytes = offset, "file streamed");
        Ok(())
    }
}

/// The per-target managers a source node keeps while peers bootstrap
/// off it.
pub struct StreamManagerRegistry {
    local: Endpoint,
    transport: Arc<dyn Transport>,
    chunk_bytes: usize,
    managers: DashMap<Endpoint, Arc<StreamManager>>,
}

impl StreamManagerRegistry {
    pub fn new(
        local: Endpoint,
        transport: Arc<dyn Transport>,
        chunk_bytes: usize,
    ) -> Self {
        Self {
            local,
            transport,
            chunk_bytes,
            managers: DashMap::new(),
        }
    }

    pub fn get_or_create(
        &self,
        target: &Endpoint,
    ) -> Arc<StreamManager> {
        self.managers
            .entry(target.clone())
            .or_insert_with(|| {
                Arc::new(StreamManager::new(
                    self.local.clone(),
                    target.clone(),
                    self.transport.clone(),
                    self.chunk_bytes,
                ))
            })
            .value()
            .clone()
    }

    pub fn get(
        &self,
        target: &Endpoint,
    ) -> Option<Arc<StreamManager>> {
        self.managers.get(target).map(|e| e.value().clone())
    }
}
