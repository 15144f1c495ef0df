//! Wire messages for the bootstrap protocol.
//!
//! Every frame on the wire is a length-prefixed [`Message`] envelope: a
//! verb tag, the sender identity, and an opaque protobuf body. Bodies
//! are the typed messages below; which body a verb carries is fixed by
//! the protocol table in the module docs of [`crate::bootstrap`].

mod exts;

#[cfg(test)]
mod proto_test;

pub use exts::*;

use bytes::Bytes;

/// Message kinds dispatched to a handler on arrival.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum Verb {
    Unspecified = 0,
    /// newcomer -> most-loaded peer, request/response, empty body.
    /// The reply body is the proposed token as a UTF-8 string.
    BootstrapToken = 1,
    /// newcomer -> source: the ranges the source owes, and to whom.
    BootstrapMetadata = 2,
    /// source -> newcomer: the files about to be shipped.
    BootstrapInitiate = 3,
    /// newcomer -> source: ready to receive, start streaming.
    BootstrapInitiateDone = 4,
    /// source -> newcomer: one slice of one file.
    StreamChunk = 5,
    /// newcomer -> source: per-file verdict (keep re-streaming or discard).
    BootstrapTerminate = 6,
}

/// Point-to-point envelope. `id` correlates a reply with its request on
/// request/response verbs; one-way verbs ignore it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Message {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(enumeration = "Verb", tag = "2")]
    pub verb: i32,
    #[prost(string, tag = "3")]
    pub from_host: ::prost::alloc::string::String,
    #[prost(uint32, tag = "4")]
    pub from_port: u32,
    #[prost(bytes = "bytes", tag = "5")]
    pub body: Bytes,
}

/// A half-open arc `(left, right]` of the ring, boundaries in the
/// partitioner's canonical string form.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RingRange {
    #[prost(string, tag = "1")]
    pub left: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub right: ::prost::alloc::string::String,
}

/// Tells a source node which ranges it owes and where to ship them.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BootstrapMetadataMessage {
    #[prost(message, repeated, tag = "1")]
    pub ranges: ::prost::alloc::vec::Vec<RingRange>,
    #[prost(string, tag = "2")]
    pub target_host: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub target_port: u32,
}

/// One file to be transferred. `target_file` is the source's path when
/// the context is created; the newcomer rewrites it to a local path
/// before any byte arrives.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamContext {
    #[prost(string, tag = "1")]
    pub table: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub target_file: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub expected_bytes: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BootstrapInitiateMessage {
    #[prost(message, repeated, tag = "1")]
    pub contexts: ::prost::alloc::vec::Vec<StreamContext>,
}

/// Post-transfer verdict for one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::prost::Enumeration)]
#[repr(i32)]
pub enum StreamAction {
    Unspecified = 0,
    /// The file arrived intact; the source may discard its copy.
    Delete = 1,
    /// Re-send the file.
    Stream = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamStatus {
    /// The file as the source named it.
    #[prost(string, tag = "1")]
    pub file: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub expected_bytes: u64,
    /// Usable bytes that actually landed; zero when the transfer was
    /// discarded for corruption.
    #[prost(uint64, tag = "3")]
    pub bytes_received: u64,
    #[prost(enumeration = "StreamAction", tag = "4")]
    pub action: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StreamStatusMessage {
    #[prost(message, optional, tag = "1")]
    pub status: ::core::option::Option<StreamStatus>,
}

/// One slice of one file. `crc` is the CRC32 of the whole file and is
/// only meaningful on the `eof` chunk.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileChunk {
    /// The file as the source names it; the receiver maps this to its
    /// rewritten local path.
    #[prost(string, tag = "1")]
    pub file: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub offset: u64,
    #[prost(bytes = "bytes", tag = "3")]
    pub data: Bytes,
    #[prost(bool, tag = "4")]
    pub eof: bool,
    #[prost(uint32, tag = "5")]
    pub crc: u32,
}
