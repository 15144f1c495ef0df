use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use tracing::warn;

use super::StreamContextManager;
use crate::network::VerbHandler;
use crate::FileChunk;
use crate::Message;
use crate::Result;
use crate::StorageError;

struct Progress {
    bytes: u64,
    hasher: crc32fast::Hasher,
}

/// Newcomer-side sink for [`FileChunk`] frames: writes each slice to
/// the rewritten local path, and on the final slice verifies the CRC
/// and retires the file through the [`StreamContextManager`].
///
/// A corrupt file is deleted on the spot and completed with zero
/// received bytes, which forces a `Stream` verdict upstream.
pub struct FileChunkReceiver {
    contexts: Arc<StreamContextManager>,
    progress: DashMap<(String, String), Progress>,
}

impl FileChunkReceiver {
    pub fn new(contexts: Arc<StreamContextManager>) -> Self {
        Self {
            contexts,
            progress: DashMap::new(),
        }
    }

    async fn append_chunk(
        path: &Path,
        data: &[u8],
        truncate: bool,
    ) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::PathError {
                    path: parent.to_path_buf(),
                    source: e,
                }
            })?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.create(true).write(true);
        if truncate {
            options.truncate(true);
        } else {
            options.append(true);
        }

        let mut file = options.open(path).await.map_err(|e| StorageError::PathError {
            path: path.to_path_buf(),
            source: e,
        })?;
        file.write_all(data).await.map_err(StorageError::IoError)?;
        file.flush().await.map_err(StorageError::IoError)?;
        Ok(())
    }
}

#[async_trait]
impl VerbHandler for FileChunkReceiver {
    async fn do_verb(
        &self,
        message: Message,
    ) -> Result<Option<Message>> {
        let chunk: FileChunk = message.decode_body()?;
        let host = message.from_host.clone();

        let Some(local_path) = self.contexts.local_path(&host, &chunk.file) else {
            warn!(%host, file = %chunk.file, "chunk for unregistered file");
            return Ok(None);
        };
        let path = Path::new(&local_path).to_path_buf();
        let key = (host.clone(), chunk.file.clone());

        let mut progress = if chunk.offset == 0 {
            // A restart discards whatever a previous attempt left.
            self.progress.remove(&key);
            Progress {
                bytes: 0,
                hasher: crc32fast::Hasher::new(),
            }
        } else {
            match self.progress.remove(&key) {
                Some((_, progress)) if progress.bytes == chunk.offset => progress,
                _ => {
                    // A gap means an earlier slice was lost; drop the
                    // rest and let the verdict channel re-request.
                    warn!(%host, file = %chunk.file, offset = chunk.offset, "out-of-order chunk");
                    return Ok(None);
                }
            }
        };

        Self::append_chunk(&path, &chunk.data, chunk.offset == 0).await?;
        progress.hasher.update(&chunk.data);
        progress.bytes += chunk.data.len() as u64;

        if !chunk.eof {
            self.progress.insert(key, progress);
            return Ok(None);
        }

        let mut bytes_received = progress.bytes;
        if progress.hasher.finalize() != chunk.crc {
            let corruption = StorageError::DataCorruption {
                location: chunk.file.clone(),
            };
            warn!(%host, "{corruption}, discarding file");
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), "failed to remove corrupt file: {e}");
            }
            bytes_received = 0;
        } else {
            debug!(%host, file = %chunk.file, bytes = bytes_received, "file received");
        }

        self.contexts.complete_file(&host, &chunk.file, bytes_received).await;
        Ok(None)
    }
}
