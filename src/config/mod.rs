//! Configuration for a ring node.
//!
//! Hierarchical loading: defaults from code, a file named by
//! `CONFIG_PATH`, then environment variables with the `RINGKV__`
//! prefix, later sources winning. Validation is deferred so callers
//! can stack overrides before [`NodeConfig::validate`].

mod bootstrap;
mod cluster;
mod network;
mod storage;

pub use bootstrap::*;
pub use cluster::*;
pub use network::*;
pub use storage::*;

#[cfg(test)]
mod config_test;

use std::env;
use std::path::Path;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct NodeConfig {
    /// Node identity and ring parameters
    pub cluster: ClusterConfig,
    /// Messaging timeouts and framing limits
    pub network: NetworkConfig,
    /// Join-time behavior
    pub bootstrap: BootstrapConfig,
    /// On-disk table layout
    pub storage: StorageConfig,
}

impl NodeConfig {
    /// Merge defaults, the `CONFIG_PATH` file (if set) and `RINGKV__`
    /// environment variables, later sources winning. Does NOT
    /// validate; call [`NodeConfig::validate`] once all overrides are
    /// applied.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("RINGKV")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Apply one more override file on top of the current values.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("RINGKV")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validate all subsystems and return the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.cluster.validate()?;
        self.network.validate()?;
        self.bootstrap.validate()?;
        self.storage.validate()?;
        Ok(self)
    }
}

/// Ensures directory path is non-empty and creatable
pub(super) fn validate_directory(
    path: &Path,
    name: &str,
) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::Config(ConfigError::Message(format!(
            "{name} path cannot be empty"
        ))));
    }

    #[cfg(not(test))]
    {
        use std::fs;
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| {
                Error::Config(ConfigError::Message(format!(
                    "Failed to create {} directory at {}: {}",
                    name,
                    path.display(),
                    e
                )))
            })?;
        }
    }

    Ok(())
}
