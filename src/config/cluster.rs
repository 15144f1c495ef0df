use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use super::validate_directory;
use crate::Error;
use crate::Result;

/// Node identity and ring parameters.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterConfig {
    /// Host name this node advertises to peers
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the storage messaging service listens on
    #[serde(default = "default_storage_port")]
    pub storage_port: u16,

    /// Ring position configured out-of-band. When set, the token
    /// handshake at join time is skipped entirely.
    #[serde(default)]
    pub initial_token: Option<String>,

    /// Size of the token space. Production rings use the full `u64`
    /// space; small spans keep test topologies readable.
    #[serde(default = "default_ring_span")]
    pub ring_span: u128,

    /// Copies kept of every range
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,

    /// Log files output directory
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            storage_port: default_storage_port(),
            initial_token: None,
            ring_span: default_ring_span(),
            replication_factor: default_replication_factor(),
            log_dir: default_log_dir(),
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "host cannot be empty".into(),
            )));
        }

        if self.storage_port == 0 {
            return Err(Error::Config(ConfigError::Message(
                "storage_port must be non-zero".into(),
            )));
        }

        if self.ring_span < 2 {
            return Err(Error::Config(ConfigError::Message(
                "ring_span must be at least 2".into(),
            )));
        }

        if self.replication_factor == 0 {
            return Err(Error::Config(ConfigError::Message(
                "replication_factor must be at least 1".into(),
            )));
        }

        validate_directory(&self.log_dir, "log_dir")?;

        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_storage_port() -> u16 {
    7000
}
fn default_ring_span() -> u128 {
    1u128 << 64
}
fn default_replication_factor() -> usize {
    1
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("/tmp/ringkv/logs")
}
