use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use prost::Message as _;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use super::MessagingService;
use super::Transport;
use crate::ring::Endpoint;
use crate::Message;
use crate::NetworkConfig;
use crate::NetworkError;
use crate::Result;

/// Envelope frames over TCP: a big-endian `u32` length prefix followed
/// by the protobuf-encoded [`Message`].
///
/// One-way traffic to a peer shares a cached connection, so frames to
/// the same peer arrive in send order (the initiate-before-data
/// guarantee rides on this). Request/response exchanges use a fresh
/// connection and a deadline from [`NetworkConfig`].
pub struct TcpTransport {
    local: Endpoint,
    config: NetworkConfig,
    next_id: AtomicU64,
    outbound: DashMap<Endpoint, Arc<Mutex<TcpStream>>>,
}

impl TcpTransport {
    pub fn new(
        local: Endpoint,
        config: NetworkConfig,
    ) -> Self {
        Self {
            local,
            config,
            next_id: AtomicU64::new(1),
            outbound: DashMap::new(),
        }
    }

    async fn connect(
        &self,
        to: &Endpoint,
    ) -> Result<TcpStream> {
        let connect_timeout = Duration::from_millis(self.config.connect_timeout_ms);
        match timeout(connect_timeout, TcpStream::connect((to.host.as_str(), to.port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(NetworkError::ConnectError(format!("{to}: {e}")).into()),
            Err(_) => Err(NetworkError::Timeout {
                endpoint: to.to_string(),
                duration: connect_timeout,
            }
            .into()),
        }
    }

    async fn cached_connection(
        &self,
        to: &Endpoint,
    ) -> Result<Arc<Mutex<TcpStream>>> {
        if let Some(entry) = self.outbound.get(to) {
            return Ok(entry.value().clone());
        }
        let stream = Arc::new(Mutex::new(self.connect(to).await?));
        self.outbound.insert(to.clone(), stream.clone());
        Ok(stream)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send_request(
        &self,
        mut message: Message,
        to: &Endpoint,
    ) -> Result<Message> {
        message.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request_id = message.id;

        let mut stream = self.connect(to).await?;
        write_frame(&mut stream, &message).await?;

        let deadline = Duration::from_millis(self.config.request_timeout_ms);
        let reply = match timeout(deadline, read_frame(&mut stream, self.config.max_frame_bytes))
            .await
        {
            Ok(Ok(Some(reply))) => reply,
            Ok(Ok(None)) => return Err(NetworkError::NoReply(to.to_string()).into()),
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(NetworkError::Timeout {
                    endpoint: to.to_string(),
                    duration: deadline,
                }
                .into())
            }
        };

        if reply.id != request_id {
            return Err(NetworkError::MalformedMessage(format!(
                "reply correlation mismatch: sent {request_id}, got {}",
                reply.id
            ))
            .into());
        }
        Ok(reply)
    }

    async fn send_one_way(
        &self,
        message: Message,
        to: &Endpoint,
    ) -> Result<()> {
        let connection = self.cached_connection(to).await?;
        let mut stream = connection.lock().await;
        if let Err(e) = write_frame(&mut stream, &message).await {
            // A dead cached connection is not worth retrying here; the
            // next send re-establishes it.
            self.outbound.remove(to);
            return Err(e);
        }
        Ok(())
    }
}

impl TcpTransport {
    pub fn local_endpoint(&self) -> &Endpoint {
        &self.local
    }
}

/// Accept loop. One task per connection; frames on a connection are
/// dispatched serially so a peer's sends keep their order.
pub async fn serve(
    service: Arc<MessagingService>,
    listener: TcpListener,
    max_frame_bytes: u32,
) -> Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await.map_err(|e| {
            crate::Error::from(NetworkError::ConnectError(format!("accept: {e}")))
        })?;
        debug!(%peer_addr, "accepted storage connection");

        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(service, stream, max_frame_bytes).await {
                warn!(%peer_addr, "connection closed with error: {e}");
            }
        });
    }
}

async fn handle_connection(
    service: Arc<MessagingService>,
    mut stream: TcpStream,
    max_frame_bytes: u32,
) -> Result<()> {
    while let Some(message) = read_frame(&mut stream, max_frame_bytes).await? {
        if let Some(reply) = service.dispatch(message).await {
            write_frame(&mut stream, &reply).await?;
        }
    }
    Ok(())
}

pub(crate) async fn write_frame(
    stream: &mut TcpStream,
    message: &Message,
) -> Result<()> {
    let body = message.encode_to_vec();
    stream
        .write_u32(body.len() as u32)
        .await
        .map_err(|e| NetworkError::ConnectError(format!("write: {e}")))?;
    stream
        .write_all(&body)
        .await
        .map_err(|e| NetworkError::ConnectError(format!("write: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| NetworkError::ConnectError(format!("flush: {e}")))?;
    Ok(())
}

/// `Ok(None)` means the peer closed cleanly between frames.
pub(crate) async fn read_frame(
    stream: &mut TcpStream,
    max_frame_bytes: u32,
) -> Result<Option<Message>> {
    let len = match stream.read_u32().await {
        Ok(len) => len,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(NetworkError::ConnectError(format!("read: {e}")).into()),
    };

    if len > max_frame_bytes {
        return Err(NetworkError::MalformedMessage(format!(
            "frame of {len} bytes exceeds limit {max_frame_bytes}"
        ))
        .into());
    }

    let mut body = vec![0u8; len as usize];
    stream
        .read_exact(&mut body)
        .await
        .map_err(|e| NetworkError::ConnectError(format!("read: {e}")))?;

    let message = Message::decode(body.as_slice())
        .map_err(|e| NetworkError::MalformedMessage(format!("undecodable frame: {e}")))?;
    Ok(Some(message))
}
