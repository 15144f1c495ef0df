//! # ringkv
//!
//! A storage node for a partitioned, consistent-hashed key-value
//! store, centered on the **ring bootstrap** subsystem: how a newcomer
//! picks its position on the token ring, which peers ship it which
//! data ranges, and the per-file streaming handshake that moves the
//! on-disk tables.
//!
//! ## Core flow
//!
//! ```text
//! newcomer                         most-loaded peer / sources
//!    |-- BootstrapToken ------------------>|   split my range where?
//!    |<----------- token ------------------|
//!    |-- BootstrapMetadata --------------->|   you owe me these ranges
//!    |<---------- BootstrapInitiate -------|   here come these files
//!    |-- BootstrapInitiateDone ----------->|   ready, stream away
//!    |<============ StreamChunk* ==========|   file bytes
//!    |-- BootstrapTerminate (per file) --->|   keep / re-send verdict
//! ```
//!
//! The driver lives in [`bootstrap`]; ring arithmetic in [`ring`];
//! transfer bookkeeping in [`streaming`]; the messaging fabric in
//! [`network`].

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod gossip;
pub mod network;
pub mod proto;
pub mod ring;
pub mod storage;
pub mod streaming;

mod errors;

pub use self::config::*;
pub use self::errors::*;
pub use self::proto::*;


//-----------------------------------------------------------
// Test utils
#[cfg(test)]
#[doc(hidden)]
pub mod test_utils;
