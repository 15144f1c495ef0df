use std::sync::Arc;
use std::time::Duration;

use crate::gossip::Gossiper;
use crate::gossip::StorageLoadBalancer;
use crate::network::MessagingService;
use crate::network::Transport;
use crate::ring::Endpoint;
use crate::ring::ModuloPartitioner;
use crate::ring::Partitioner;
use crate::ring::ReplicationStrategy;
use crate::ring::SimpleStrategy;
use crate::ring::TokenMetadata;
use crate::storage::StorageService;
use crate::streaming::FileChunkReceiver;
use crate::streaming::StreamContextManager;
use crate::streaming::StreamManagerRegistry;
use crate::NodeConfig;
use crate::Verb;

/// Every collaborator the bootstrap protocol touches, threaded
/// explicitly through the driver and the verb handlers. Tests build
/// one per simulated node with whatever fakes they need.
pub struct BootstrapContext {
    pub config: Arc<NodeConfig>,
    pub local: Endpoint,
    pub partitioner: Arc<dyn Partitioner>,
    pub strategy: Arc<dyn ReplicationStrategy>,
    pub token_metadata: Arc<TokenMetadata>,
    pub transport: Arc<dyn Transport>,
    pub gossiper: Arc<Gossiper>,
    pub load_balancer: Arc<StorageLoadBalancer>,
    pub storage: Arc<StorageService>,
    pub stream_contexts: Arc<StreamContextManager>,
    pub stream_managers: Arc<StreamManagerRegistry>,
}

impl BootstrapContext {
    /// Wire the default collaborators for `config` on top of the given
    /// transport.
    pub fn new(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        let config = Arc::new(config);
        let local = Endpoint::new(config.cluster.host.clone(), config.cluster.storage_port);
        let gossiper = Arc::new(Gossiper::new());
        let load_balancer = Arc::new(StorageLoadBalancer::new(
            gossiper.clone(),
            Duration::from_millis(config.bootstrap.load_info_timeout_ms),
        ));
        let storage = Arc::new(StorageService::new(
            config.storage.clone(),
            config.cluster.ring_span,
        ));
        let stream_managers = Arc::new(StreamManagerRegistry::new(
            local.clone(),
            transport.clone(),
            config.bootstrap.stream_chunk_bytes,
        ));

        Arc::new(Self {
            local,
            partitioner: Arc::new(ModuloPartitioner::new(config.cluster.ring_span)),
            strategy: Arc::new(SimpleStrategy::new(config.cluster.replication_factor)),
            token_metadata: Arc::new(TokenMetadata::new()),
            transport,
            gossiper,
            load_balancer,
            storage,
            stream_contexts: Arc::new(StreamContextManager::new()),
            stream_managers,
            config,
        })
    }

    /// Register every bootstrap verb in the dispatch table. A node is
    /// both a potential source and a potential newcomer, so all verbs
    /// are always wired.
    pub fn register_verb_handlers(
        ctx: &Arc<Self>,
        messaging: &MessagingService,
    ) {
        messaging.register_verb_handler(
            Verb::BootstrapToken,
            Arc::new(super::BootstrapTokenHandler::new(ctx.clone())),
        );
        messaging.register_verb_handler(
            Verb::BootstrapMetadata,
            Arc::new(super::BootstrapMetadataHandler::new(ctx.clone())),
        );
        messaging.register_verb_handler(
            Verb::BootstrapInitiate,
            Arc::new(super::BootstrapInitiateHandler::new(ctx.clone())),
        );
        messaging.register_verb_handler(
            Verb::BootstrapInitiateDone,
            Arc::new(super::BootstrapInitiateDoneHandler::new(ctx.clone())),
        );
        messaging.register_verb_handler(
            Verb::BootstrapTerminate,
            Arc::new(super::BootstrapTerminateHandler::new(ctx.clone())),
        );
        messaging.register_verb_handler(
            Verb::StreamChunk,
            Arc::new(FileChunkReceiver::new(ctx.stream_contexts.clone())),
        );
    }
}
