//! In-process fixtures: a loopback transport wiring several
//! [`BootstrapContext`]s together, a fault-injecting wrapper, and
//! helpers to seed rings, load views and on-disk tables.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tempfile::TempDir;

use crate::bootstrap::BootstrapContext;
use crate::constants::LOAD;
use crate::network::MessagingService;
use crate::network::Transport;
use crate::ring::Endpoint;
use crate::ring::Token;
use crate::storage::SstableReader;
use crate::FileChunk;
use crate::Message;
use crate::NetworkError;
use crate::NodeConfig;
use crate::Result;
use crate::Verb;

/// Routes envelopes to in-process dispatch tables instead of sockets.
pub struct LoopbackTransport {
    peers: DashMap<Endpoint, Arc<MessagingService>>,
    next_id: AtomicU64,
}

impl LoopbackTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            peers: DashMap::new(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn register(
        &self,
        endpoint: Endpoint,
        service: Arc<MessagingService>,
    ) {
        self.peers.insert(endpoint, service);
    }

    fn service_of(
        &self,
        to: &Endpoint,
    ) -> Result<Arc<MessagingService>> {
        self.peers
            .get(to)
            .map(|e| e.value().clone())
            .ok_or_else(|| NetworkError::ServiceUnavailable(to.to_string()).into())
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send_request(
        &self,
        mut message: Message,
        to: &Endpoint,
    ) -> Result<Message> {
        message.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let service = self.service_of(to)?;
        service
            .dispatch(message)
            .await
            .ok_or_else(|| NetworkError::NoReply(to.to_string()).into())
    }

    async fn send_one_way(
        &self,
        message: Message,
        to: &Endpoint,
    ) -> Result<()> {
        let service = self.service_of(to)?;
        service.dispatch(message).await;
        Ok(())
    }
}

/// Corrupts the CRC of the first Data-component eof chunk it carries,
/// then behaves normally: the shape of one bit-flipped transfer.
pub struct CorruptingTransport {
    inner: Arc<LoopbackTransport>,
    fired: AtomicBool,
}

impl CorruptingTransport {
    pub fn new(inner: Arc<LoopbackTransport>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fired: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Transport for CorruptingTransport {
    async fn send_request(
        &self,
        message: Message,
        to: &Endpoint,
    ) -> Result<Message> {
        self.inner.send_request(message, to).await
    }

    async fn send_one_way(
        &self,
        mut message: Message,
        to: &Endpoint,
    ) -> Result<()> {
        if message.verb() == Verb::StreamChunk && !self.fired.load(Ordering::SeqCst) {
            if let Ok(mut chunk) = message.decode_body::<FileChunk>() {
                if chunk.eof && chunk.file.contains("-Data.db") {
                    chunk.crc = chunk.crc.wrapping_add(1);
                    message.body = Message::encode_body(&chunk);
                    self.fired.store(true, Ordering::SeqCst);
                }
            }
        }
        self.inner.send_one_way(message, to).await
    }
}

/// One simulated node: its context, dispatch table and private data
/// directory.
pub struct TestNode {
    pub ctx: Arc<BootstrapContext>,
    pub messaging: Arc<MessagingService>,
    pub endpoint: Endpoint,
    _data_dir: TempDir,
    _log_dir: TempDir,
}

pub fn fast_config(
    host: &str,
    ring_span: u128,
    replication_factor: usize,
    initial_token: Option<&str>,
    data_dir: &TempDir,
    log_dir: &TempDir,
) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.cluster.host = host.to_string();
    config.cluster.storage_port = 7000;
    config.cluster.ring_span = ring_span;
    config.cluster.replication_factor = replication_factor;
    config.cluster.initial_token = initial_token.map(str::to_string);
    config.cluster.log_dir = log_dir.path().to_path_buf();
    config.storage.data_dir = data_dir.path().to_path_buf();
    config.bootstrap.initial_delay_ms = 0;
    config.bootstrap.load_info_timeout_ms = 200;
    config.bootstrap.token_request_timeout_ms = 2_000;
    config.bootstrap.stream_chunk_bytes = 16;
    config
}

/// Build a node on the loopback, optionally sending through a wrapped
/// transport (for fault injection) while still receiving normally.
pub fn test_node(
    host: &str,
    loopback: &Arc<LoopbackTransport>,
    ring_span: u128,
    replication_factor: usize,
    initial_token: Option<&str>,
    transport_override: Option<Arc<dyn Transport>>,
) -> TestNode {
    let data_dir = TempDir::new().unwrap();
    let log_dir = TempDir::new().unwrap();
    let config = fast_config(
        host,
        ring_span,
        replication_factor,
        initial_token,
        &data_dir,
        &log_dir,
    );

    let transport: Arc<dyn Transport> = transport_override.unwrap_or_else(|| loopback.clone());
    let ctx = BootstrapContext::new(config, transport);
    let messaging = Arc::new(MessagingService::new());
    BootstrapContext::register_verb_handlers(&ctx, &messaging);

    let endpoint = ctx.local.clone();
    loopback.register(endpoint.clone(), messaging.clone());

    TestNode {
        ctx,
        messaging,
        endpoint,
        _data_dir: data_dir,
        _log_dir: log_dir,
    }
}

/// Teach every node the same ring view.
pub fn seed_ring(
    nodes: &[&TestNode],
    ring: &[(u64, &TestNode)],
) {
    for node in nodes {
        for (token, owner) in ring {
            node.ctx
                .token_metadata
                .update(Token(*token), owner.endpoint.clone(), false);
        }
    }
}

/// Let `observer` see `peer` carrying `load`.
pub fn seed_load(
    observer: &TestNode,
    peer: &TestNode,
    load: f64,
) {
    observer
        .ctx
        .gossiper
        .apply_remote_state(peer.endpoint.clone(), LOAD, format!("{load}"));
}

/// Drop a live sstable (Data plus optional Index component) into a
/// node's column-family store.
pub fn seed_sstable(
    node: &TestNode,
    table: &str,
    cf: &str,
    generation: u64,
    data: &[u8],
    index: Option<&[u8]>,
) -> std::path::PathBuf {
    let store = node.ctx.storage.column_family_store(table, cf);
    std::fs::create_dir_all(store.directory()).unwrap();

    let data_path = store.directory().join(format!("{cf}-{generation}-Data.db"));
    std::fs::write(&data_path, data).unwrap();
    if let Some(index) = index {
        let index_path = store.directory().join(format!("{cf}-{generation}-Index.db"));
        std::fs::write(&index_path, index).unwrap();
    }

    store.add_sstable(Arc::new(SstableReader::open(data_path.clone()).unwrap()));
    data_path
}

/// Poll until `predicate` holds or the deadline passes.
pub async fn wait_until<F>(
    mut predicate: F,
    deadline: Duration,
) -> bool
where
    F: FnMut() -> bool,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
