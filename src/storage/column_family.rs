use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::RwLock;

use tracing::info;

use super::SstableName;
use super::SstableReader;
use crate::constants::DATA_SUFFIX;

/// One column family of one table: its data directory, its live
/// sstables, and the generation counter new files draw from.
pub struct ColumnFamilyStore {
    table: String,
    name: String,
    directory: PathBuf,
    generation: AtomicU64,
    sstables: RwLock<Vec<Arc<SstableReader>>>,
}

impl ColumnFamilyStore {
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        directory: PathBuf,
    ) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            directory,
            generation: AtomicU64::new(0),
            sstables: RwLock::new(Vec::new()),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }

    /// A fresh temporary Data-component file name. Each call burns a
    /// generation, so concurrent allocations never collide.
    pub fn temp_sstable_file_name(&self) -> String {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        SstableName {
            column_family: self.name.clone(),
            generation,
            temporary: true,
            kind: DATA_SUFFIX.to_string(),
        }
        .format()
    }

    /// Install a completed table into the live set.
    pub fn add_sstable(
        &self,
        reader: Arc<SstableReader>,
    ) {
        info!(table = %self.table, cf = %self.name, file = %reader.file_name(), "added sstable");
        self.sstables.write().unwrap().push(reader);
    }

    pub fn sstables(&self) -> Vec<Arc<SstableReader>> {
        self.sstables.read().unwrap().clone()
    }
}
