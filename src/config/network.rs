use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Messaging timeouts and framing limits.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    /// Socket connect timeout
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Deadline for a request/response exchange. The original design
    /// waited forever on the token request; every request here carries
    /// this bound instead.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Upper bound on a single wire frame
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "request_timeout_ms must be non-zero".into(),
            )));
        }

        if self.max_frame_bytes < 1024 {
            return Err(Error::Config(ConfigError::Message(
                "max_frame_bytes must be at least 1024".into(),
            )));
        }

        Ok(())
    }
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_max_frame_bytes() -> u32 {
    8 * 1024 * 1024
}
