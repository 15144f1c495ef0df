//! Error hierarchy for the ring bootstrap subsystem,
//! categorized by protocol layer and operational concerns.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (network, storage, serialization)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Node configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bootstrap protocol violations and failures
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// No peer has reported load; there is nothing to split
    #[error("No bootstrap sources found")]
    NoSourcesFound,

    /// A split request produced the wrong number of boundary tokens.
    /// Indicates a programming error in the split provider.
    #[error("Expected {expected} split tokens, got {actual}")]
    BadSplitCount { expected: usize, actual: usize },

    /// The most-loaded peer never produced a usable token
    #[error("Token request to {endpoint} failed: {detail}")]
    TokenRequestFailed { endpoint: String, detail: String },

    /// A token string failed to parse through the partitioner
    #[error("Invalid token string: {0}")]
    InvalidToken(String),

    /// A range with identical boundary tokens is not a range
    #[error("Degenerate range at token {0}")]
    DegenerateRange(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    /// Endpoint unavailable or connection refused
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Peer communication timeout
    #[error("Request to {endpoint} timed out after {duration:?}")]
    Timeout { endpoint: String, duration: Duration },

    /// Persistent connection failures
    #[error("Socket connect failed: {0}")]
    ConnectError(String),

    /// A network payload that cannot be decoded. All strings on the
    /// wire are UTF-8 by construction; a decode failure means bit
    /// corruption rather than a protocol mismatch.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A verb arrived with no registered handler
    #[error("No handler registered for verb {0}")]
    UnknownVerb(i32),

    /// A request/response exchange produced no reply frame
    #[error("Peer {0} closed the connection before replying")]
    NoReply(String),

    /// Background task failed
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Disk I/O failures during table operations
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// I/O failure with the offending path attached
    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Checksum validation failures
    #[error("Data corruption detected at {location}")]
    DataCorruption { location: String },

    /// A shipped file name that does not follow `<cf>-<gen>-<Kind>.db`
    #[error("Unrecognized sstable file name: {0}")]
    BadFileName(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("Encoding failed: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error("Decoding failed: {0}")]
    Decode(#[from] prost::DecodeError),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    // Network layer
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    // Storage layer
    #[error("Storage operation failed")]
    Storage(#[from] StorageError),

    // Wire serialization
    #[error("Serialization error")]
    Serialization(#[from] SerializationError),

    #[error("Node failed to start: {0}")]
    NodeStartFailed(String),
}

// ============== Conversion Implementations ============== //
impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::System(SystemError::Network(e))
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::System(SystemError::Storage(e))
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<prost::DecodeError> for Error {
    fn from(e: prost::DecodeError) -> Self {
        SerializationError::Decode(e).into()
    }
}

impl From<prost::EncodeError> for Error {
    fn from(e: prost::EncodeError) -> Self {
        SerializationError::Encode(e).into()
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        StorageError::IoError(e).into()
    }
}

impl From<JoinError> for Error {
    fn from(e: JoinError) -> Self {
        NetworkError::TaskFailed(e).into()
    }
}
