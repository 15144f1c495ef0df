use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::choose_bootstrap_token;
use super::compute_transfer_plan;
use super::BootstrapContext;
use super::TransferPlan;
use crate::constants::BOOTSTRAP_MODE;
use crate::ring::Endpoint;
use crate::ring::Range;
use crate::ring::Token;
use crate::BootstrapMetadataMessage;
use crate::Message;
use crate::Result;
use crate::RingRange;
use crate::Verb;

/// Handles the bootstrapping responsibilities for a set of endpoints
/// being introduced to the ring, in the common case the local node
/// joining. Computes the transfer plan against a ring snapshot and
/// asks each owing source to start shipping.
pub struct Bootstrapper {
    ctx: Arc<BootstrapContext>,
    targets: Vec<Endpoint>,
    tokens: Vec<Token>,
}

impl Bootstrapper {
    pub fn new(
        ctx: Arc<BootstrapContext>,
        targets: Vec<Endpoint>,
        tokens: Vec<Token>,
    ) -> Self {
        Self {
            ctx,
            targets,
            tokens,
        }
    }

    pub async fn run(&self) -> Result<()> {
        // Record the pairs as full ring members so the calculator
        // treats them as newcomers rather than replicas-in-waiting.
        for (token, target) in self.tokens.iter().zip(&self.targets) {
            self.ctx.token_metadata.update(*token, target.clone(), false);
        }

        let new_nodes: Vec<(Token, Endpoint)> = self
            .tokens
            .iter()
            .copied()
            .zip(self.targets.iter().cloned())
            .collect();

        let snapshot = self.ctx.token_metadata.snapshot();
        let plan = compute_transfer_plan(&snapshot, &new_nodes, self.ctx.strategy.as_ref());
        debug!(targets = ?self.targets, ranges = plan.len(), "beginning bootstrap process");

        self.assign_work(plan).await
    }

    /// Group the plan by source and tell each source which ranges it
    /// owes which target. Sources are registered before the first
    /// message goes out, so an instant reply can never observe a
    /// half-filled registry.
    async fn assign_work(
        &self,
        plan: TransferPlan,
    ) -> Result<()> {
        let mut by_source: BTreeMap<(Endpoint, Endpoint), Vec<Range>> = BTreeMap::new();
        for (range, pairs) in &plan {
            for pair in pairs {
                by_source
                    .entry((pair.source.clone(), pair.target.clone()))
                    .or_default()
                    .push(*range);
            }
        }

        for (source, _) in by_source.keys() {
            self.ctx.storage.add_bootstrap_source(source.clone());
        }

        for ((source, target), ranges) in by_source {
            info!(%source, %target, ranges = ranges.len(), "requesting bootstrap data");
            let metadata = BootstrapMetadataMessage {
                ranges: ranges
                    .iter()
                    .map(|r| RingRange {
                        left: self.ctx.partitioner.token_to_string(&r.left),
                        right: self.ctx.partitioner.token_to_string(&r.right),
                    })
                    .collect(),
                target_host: target.host.clone(),
                target_port: target.port as u32,
            };
            let message = Message::new(
                Verb::BootstrapMetadata,
                &self.ctx.local,
                Message::encode_body(&metadata),
            );
            self.ctx.transport.send_one_way(message, &source).await?;
        }

        if self.ctx.storage.bootstrap_source_count() == 0 {
            info!("no ranges to transfer, leaving bootstrap mode");
            self.ctx.gossiper.remove_application_state(BOOTSTRAP_MODE);
        }
        Ok(())
    }
}

/// The join sequence: wait out gossip stabilization, collect load
/// info, settle on a token, announce bootstrap mode, and hand the
/// plan to the sources. Returns once dispatch is done; the rest is
/// driven by incoming messages.
pub async fn start_bootstrap(ctx: Arc<BootstrapContext>) -> Result<()> {
    info!("starting in bootstrap mode (first, sleeping to get load information)");
    sleep(Duration::from_millis(ctx.config.bootstrap.initial_delay_ms)).await;

    ctx.load_balancer.wait_for_load_info().await?;

    let token = match &ctx.config.cluster.initial_token {
        Some(configured) => {
            let token = ctx.partitioner.token_from_string(configured)?;
            info!(%token, "using configured initial token");
            token
        }
        None => choose_bootstrap_token(&ctx).await.map_err(|e| {
            error!("bootstrap failed before any data motion: {e}");
            e
        })?,
    };
    ctx.storage.update_token(token);

    ctx.gossiper.add_application_state(BOOTSTRAP_MODE, "true");

    let bootstrapper = Bootstrapper::new(ctx.clone(), vec![ctx.local.clone()], vec![token]);
    bootstrapper.run().await.map_err(|e| {
        error!("bootstrap dispatch failed: {e}");
        e
    })
}
