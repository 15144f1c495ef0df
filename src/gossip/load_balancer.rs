use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio::time::Instant;
use tracing::info;
use tracing::warn;

use super::Gossiper;
use crate::constants::LOAD;
use crate::ring::Endpoint;
use crate::Result;

/// The load view bootstrap needs: which peers carry how much data.
/// Values are whatever scalar the peers publish under the `LOAD`
/// state key.
pub struct StorageLoadBalancer {
    gossiper: Arc<Gossiper>,
    wait_timeout: Duration,
}

impl StorageLoadBalancer {
    pub fn new(
        gossiper: Arc<Gossiper>,
        wait_timeout: Duration,
    ) -> Self {
        Self {
            gossiper,
            wait_timeout,
        }
    }

    /// Block until at least one peer has reported load, bounded by the
    /// configured deadline. Returning with an empty view is not an
    /// error here; the token chooser turns it into the fatal
    /// "no sources" failure.
    pub async fn wait_for_load_info(&self) -> Result<()> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let notified = self.gossiper.changed();
            if !self.load_info().is_empty() {
                info!("load info available from {} peer(s)", self.load_info().len());
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("no peer reported load within {:?}", self.wait_timeout);
                return Ok(());
            }

            tokio::select! {
                _ = notified => {}
                _ = sleep(remaining) => {
                    warn!("no peer reported load within {:?}", self.wait_timeout);
                    return Ok(());
                }
            }
        }
    }

    /// Per-endpoint load in first-seen order. Unparseable entries are
    /// dropped.
    pub fn load_info(&self) -> Vec<(Endpoint, f64)> {
        self.gossiper
            .endpoints_with_state(LOAD)
            .into_iter()
            .filter_map(|(endpoint, value)| match value.parse::<f64>() {
                Ok(load) => Some((endpoint, load)),
                Err(_) => {
                    warn!(%endpoint, %value, "ignoring unparseable load value");
                    None
                }
            })
            .collect()
    }
}
