use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use dashmap::DashMap;
use tracing::info;

use super::ColumnFamilyStore;
use crate::ring::Endpoint;
use crate::ring::Range;
use crate::ring::Token;
use crate::BootstrapError;
use crate::Result;
use crate::StorageConfig;

/// Node-local storage state: the ring position, the key sample that
/// drives data-aware splits, the column-family registry, and the
/// bookkeeping of which peers still owe us bootstrap data.
pub struct StorageService {
    config: StorageConfig,
    ring_span: u128,
    token: RwLock<Option<Token>>,
    key_sample: RwLock<Vec<Token>>,
    bootstrap_sources: Mutex<HashSet<Endpoint>>,
    stores: DashMap<(String, String), Arc<ColumnFamilyStore>>,
}

impl StorageService {
    pub fn new(
        config: StorageConfig,
        ring_span: u128,
    ) -> Self {
        Self {
            config,
            ring_span,
            token: RwLock::new(None),
            key_sample: RwLock::new(Vec::new()),
            bootstrap_sources: Mutex::new(HashSet::new()),
            stores: DashMap::new(),
        }
    }

    pub fn update_token(
        &self,
        token: Token,
    ) {
        info!(%token, "updating local token");
        *self.token.write().unwrap() = Some(token);
    }

    pub fn local_token(&self) -> Option<Token> {
        *self.token.read().unwrap()
    }

    /// Replace the sample of locally stored key tokens. The membership
    /// of this sample, not its size, is what split quality depends on.
    pub fn set_key_sample(
        &self,
        sample: Vec<Token>,
    ) {
        *self.key_sample.write().unwrap() = sample;
    }

    /// `count + 1` boundary tokens partitioning `primary_range` into
    /// `count` roughly-equal shards: data-quantile boundaries when a
    /// key sample exists, token-space interpolation otherwise.
    pub fn get_splits(
        &self,
        primary_range: Range,
        count: usize,
    ) -> Result<Vec<Token>> {
        if count == 0 {
            return Err(BootstrapError::BadSplitCount {
                expected: 1,
                actual: 0,
            }
            .into());
        }

        let mut in_range: Vec<Token> = self
            .key_sample
            .read()
            .unwrap()
            .iter()
            .copied()
            .filter(|t| primary_range.contains(t))
            .collect();

        let mut boundaries = Vec::with_capacity(count + 1);
        boundaries.push(primary_range.left);

        if in_range.is_empty() {
            // No data to measure; fall back to equal arcs.
            let left = primary_range.left.0 as u128;
            let right = primary_range.right.0 as u128;
            let mut arc = (right + self.ring_span - left) % self.ring_span;
            if arc == 0 {
                arc = self.ring_span;
            }
            for i in 1..count {
                boundaries.push(Token(
                    ((left + arc * i as u128 / count as u128) % self.ring_span) as u64,
                ));
            }
        } else {
            // Sort along the arc so wrap ranges quantile correctly.
            let left = primary_range.left.0 as u128;
            in_range
                .sort_by_key(|t| ((t.0 as u128) + self.ring_span - left) % self.ring_span);
            for i in 1..count {
                let idx = in_range.len() * i / count;
                boundaries.push(in_range[idx.min(in_range.len() - 1)]);
            }
        }

        boundaries.push(primary_range.right);
        Ok(boundaries)
    }

    // -
    // Bootstrap source bookkeeping

    pub fn add_bootstrap_source(
        &self,
        source: Endpoint,
    ) {
        self.bootstrap_sources.lock().unwrap().insert(source);
    }

    /// Remove a finished source; returns how many are still owed.
    pub fn remove_bootstrap_source(
        &self,
        source: &Endpoint,
    ) -> usize {
        let mut sources = self.bootstrap_sources.lock().unwrap();
        sources.remove(source);
        sources.len()
    }

    pub fn bootstrap_source_count(&self) -> usize {
        self.bootstrap_sources.lock().unwrap().len()
    }

    // -
    // Column-family registry

    /// The store for `(table, cf)`, created on first use with its data
    /// directory under the configured root.
    pub fn column_family_store(
        &self,
        table: &str,
        column_family: &str,
    ) -> Arc<ColumnFamilyStore> {
        self.stores
            .entry((table.to_string(), column_family.to_string()))
            .or_insert_with(|| {
                Arc::new(ColumnFamilyStore::new(
                    table,
                    column_family,
                    self.config.data_file_location(table),
                ))
            })
            .value()
            .clone()
    }

    pub fn data_file_location(
        &self,
        table: &str,
    ) -> PathBuf {
        self.config.data_file_location(table)
    }

    /// Component files a source owes for the requested ranges. Tables
    /// are not range-partitioned on disk, so the live table set of
    /// every column family covers any owed range.
    pub fn files_for_ranges(
        &self,
        ranges: &[Range],
    ) -> Vec<(String, PathBuf)> {
        if ranges.is_empty() {
            return Vec::new();
        }

        let mut files = Vec::new();
        for entry in self.stores.iter() {
            let store = entry.value();
            for sstable in store.sstables() {
                for path in sstable.component_paths() {
                    files.push((store.table().to_string(), path));
                }
            }
        }
        files.sort();
        files
    }
}
