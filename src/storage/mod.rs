//! On-disk tables and the node-local storage surface bootstrap talks
//! to: temp file naming, rename-to-final installation, and the
//! registry of column-family stores.

mod column_family;
mod sstable;
mod storage_service;

pub use column_family::*;
pub use sstable::*;
pub use storage_service::*;
