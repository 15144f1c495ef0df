//! The join protocol.
//!
//! A newcomer picks a ring position, computes which peers owe it which
//! ranges, and coordinates the per-source streaming handshake:
//!
//! - `BootstrapToken` asks the most-loaded node for a token that splits
//!   its primary range roughly in half.
//! - `BootstrapMetadata` tells each source node which ranges to ship.
//! - Sources answer with `BootstrapInitiate` ("get ready to receive")
//!   listing the files about to move.
//! - The newcomer allocates local names and acks with
//!   `BootstrapInitiateDone`; only then do `StreamChunk` frames flow.
//! - Each completed file earns a `BootstrapTerminate` verdict telling
//!   the source to discard its copy or re-send.

mod completion;
mod context;
mod driver;
mod handlers;
mod plan;
mod token_chooser;

pub use completion::*;
pub use context::*;
pub use driver::*;
pub use handlers::*;
pub use plan::*;
pub use token_chooser::*;

#[cfg(test)]
mod handlers_test;
