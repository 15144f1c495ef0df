use std::collections::HashMap;

use super::Endpoint;
use super::Range;
use super::RingSnapshot;

/// Maps ranges to the ordered endpoint list storing them. The first
/// entry is the primary replica.
pub trait ReplicationStrategy: Send + Sync + 'static {
    fn replication_factor(&self) -> usize;

    /// Replica sets for `ranges` against the given ring view. Ranges
    /// whose right boundary owns no token get no entry.
    fn range_to_endpoint_map(
        &self,
        ranges: &[Range],
        snapshot: &RingSnapshot,
    ) -> HashMap<Range, Vec<Endpoint>>;
}

/// Rack-unaware placement: the owner of a range's right boundary plus
/// the next `replication_factor - 1` distinct endpoints clockwise.
pub struct SimpleStrategy {
    replication_factor: usize,
}

impl SimpleStrategy {
    pub fn new(replication_factor: usize) -> Self {
        debug_assert!(replication_factor >= 1);
        Self { replication_factor }
    }

    fn replicas_for(
        &self,
        range: &Range,
        snapshot: &RingSnapshot,
    ) -> Option<Vec<Endpoint>> {
        let primary = snapshot.endpoint_of(&range.right)?.clone();
        let mut replicas = vec![primary];

        for (_, endpoint) in snapshot.successors(&range.right) {
            if replicas.len() >= self.replication_factor {
                break;
            }
            if !replicas.contains(&endpoint) {
                replicas.push(endpoint);
            }
        }
        Some(replicas)
    }
}

impl ReplicationStrategy for SimpleStrategy {
    fn replication_factor(&self) -> usize {
        self.replication_factor
    }

    fn range_to_endpoint_map(
        &self,
        ranges: &[Range],
        snapshot: &RingSnapshot,
    ) -> HashMap<Range, Vec<Endpoint>> {
        let mut map = HashMap::with_capacity(ranges.len());
        for range in ranges {
            if let Some(replicas) = self.replicas_for(range, snapshot) {
                map.insert(*range, replicas);
            }
        }
        map
    }
}
