//! Per-file transfer bookkeeping on both sides of a bootstrap.
//!
//! The newcomer tracks outstanding files per source host in the
//! [`StreamContextManager`] and fires a [`StreamCompletion`] capability
//! as each file lands; the source keeps one [`StreamManager`] per
//! target with the files it still owes.

mod chunk_handler;
mod context_manager;
mod stream_manager;

pub use chunk_handler::*;
pub use context_manager::*;
pub use stream_manager::*;

#[cfg(test)]
mod context_manager_test;

use async_trait::async_trait;

use crate::Result;
use crate::StreamContext;
use crate::StreamStatus;

/// Invoked when one file from one host has fully arrived. The single
/// method keeps this a plain capability: bootstrap installs tables
/// with it, a repair path would install something else.
#[async_trait]
pub trait StreamCompletion: Send + Sync + 'static {
    async fn on_stream_completion(
        &self,
        host: &str,
        context: StreamContext,
        status: StreamStatus,
    ) -> Result<()>;
}
