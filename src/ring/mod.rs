//! The token ring: positions, arcs, ownership metadata and replica
//! placement.
//!
//! Everything here is pure data plus arithmetic; the bootstrap
//! coordination in [`crate::bootstrap`] runs against cloned
//! [`RingSnapshot`]s so membership churn never races a running
//! calculation.

mod endpoint;
mod partitioner;
mod range;
mod replication;
mod token;
mod token_metadata;

pub use endpoint::*;
pub use partitioner::*;
pub use range::*;
pub use replication::*;
pub use token::*;
pub use token_metadata::*;

#[cfg(test)]
mod token_metadata_test;
