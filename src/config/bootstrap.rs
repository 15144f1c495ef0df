use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Join-time behavior.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BootstrapConfig {
    /// Pause before collecting load info, so gossip has settled by the
    /// time the most-loaded peer is picked.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Deadline on the token-split request to the most-loaded peer
    #[serde(default = "default_token_request_timeout_ms")]
    pub token_request_timeout_ms: u64,

    /// How long to wait for at least one peer to report load before
    /// the join fails with "no sources"
    #[serde(default = "default_load_info_timeout_ms")]
    pub load_info_timeout_ms: u64,

    /// Slice size for file streaming
    #[serde(default = "default_stream_chunk_bytes")]
    pub stream_chunk_bytes: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            token_request_timeout_ms: default_token_request_timeout_ms(),
            load_info_timeout_ms: default_load_info_timeout_ms(),
            stream_chunk_bytes: default_stream_chunk_bytes(),
        }
    }
}

impl BootstrapConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stream_chunk_bytes == 0 {
            return Err(Error::Config(ConfigError::Message(
                "stream_chunk_bytes must be non-zero".into(),
            )));
        }

        if self.load_info_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "load_info_timeout_ms must be non-zero".into(),
            )));
        }

        Ok(())
    }
}

fn default_initial_delay_ms() -> u64 {
    30_000
}
fn default_token_request_timeout_ms() -> u64 {
    30_000
}
fn default_load_info_timeout_ms() -> u64 {
    60_000
}
fn default_stream_chunk_bytes() -> usize {
    64 * 1024
}
