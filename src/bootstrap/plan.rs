use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;

use tracing::debug;

use crate::ring::Endpoint;
use crate::ring::Range;
use crate::ring::ReplicationStrategy;
use crate::ring::RingSnapshot;
use crate::ring::Token;

/// "source ships this range to target."
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceTarget {
    pub source: Endpoint,
    pub target: Endpoint,
}

/// For each range a newcomer becomes responsible for, which existing
/// replicas ship it and to whom.
pub type TransferPlan = BTreeMap<Range, Vec<SourceTarget>>;

/// The ring-delta calculation: pure over an immutable ring view.
///
/// The newcomer tokens are first removed from the view, the ranges
/// they split inherit the pre-split replica lists, and the replica
/// maps before and after the insertion are compared. Every endpoint
/// that appears in a range's new replica list but not its old one is a
/// target; one old replica is picked as its source, favoring whoever
/// has the least outgoing work so far.
pub fn compute_transfer_plan(
    snapshot: &RingSnapshot,
    new_nodes: &[(Token, Endpoint)],
    strategy: &dyn ReplicationStrategy,
) -> TransferPlan {
    let mut working = snapshot.clone();
    for (token, _) in new_nodes {
        working.remove(token);
    }

    let old_ranges = working.ranges();
    debug!(old_ranges = old_ranges.len(), "computing transfer plan");
    let mut old_map = strategy.range_to_endpoint_map(&old_ranges, &working);

    // Propagate each split range's replica identity to its subranges.
    // The lists are copied; the two subranges must not alias.
    let new_tokens: Vec<Token> = new_nodes.iter().map(|(t, _)| *t).collect();
    for (range, subranges) in split_range_mapping(&old_ranges, &new_tokens) {
        if let Some(replicas) = old_map.remove(&range) {
            for subrange in subranges {
                old_map.insert(subrange, replicas.clone());
            }
        }
    }

    let mut augmented = working;
    for (token, endpoint) in new_nodes {
        augmented.insert(*token, endpoint.clone());
    }
    let new_ranges = augmented.ranges();
    debug!(new_ranges = new_ranges.len(), "token set augmented");

    let new_map: BTreeMap<Range, Vec<Endpoint>> = strategy
        .range_to_endpoint_map(&new_ranges, &augmented)
        .into_iter()
        .collect();

    let newcomers: HashSet<&Endpoint> = new_nodes.iter().map(|(_, e)| e).collect();
    source_target_info(&old_map, &new_map, &newcomers)
}

/// Which old ranges the new tokens split, and into what. A range
/// containing several new tokens splits into one subrange per arc
/// segment.
pub(crate) fn split_range_mapping(
    old_ranges: &[Range],
    new_tokens: &[Token],
) -> HashMap<Range, Vec<Range>> {
    let mut mapping = HashMap::new();
    for range in old_ranges {
        let mut inside: Vec<Token> = new_tokens
            .iter()
            .copied()
            .filter(|t| *t != range.right && range.contains(t))
            .collect();
        if inside.is_empty() {
            continue;
        }

        // Order along the arc so successive cuts nest correctly even
        // through the wrap point.
        inside.sort_by_key(|t| t.0.wrapping_sub(range.left.0));

        let mut subranges = Vec::with_capacity(inside.len() + 1);
        let mut left = range.left;
        for token in inside {
            subranges.push(Range::new(left, token));
            left = token;
        }
        subranges.push(Range::new(left, range.right));
        mapping.insert(*range, subranges);
    }
    mapping
}

fn source_target_info(
    old_map: &HashMap<Range, Vec<Endpoint>>,
    new_map: &BTreeMap<Range, Vec<Endpoint>>,
    newcomers: &HashSet<&Endpoint>,
) -> TransferPlan {
    let mut plan = TransferPlan::new();
    let mut outgoing: HashMap<Endpoint, usize> = HashMap::new();

    for (range, new_replicas) in new_map {
        let old_replicas = old_map.get(range).cloned().unwrap_or_default();

        for target in new_replicas {
            if old_replicas.contains(target) || !newcomers.contains(target) {
                continue;
            }

            let source = old_replicas
                .iter()
                .filter(|candidate| *candidate != target)
                .min_by_key(|candidate| outgoing.get(*candidate).copied().unwrap_or(0));

            let Some(source) = source else {
                debug!(%range, %target, "no old replica can source this range");
                continue;
            };

            *outgoing.entry(source.clone()).or_insert(0) += 1;
            plan.entry(*range).or_default().push(SourceTarget {
                source: source.clone(),
                target: target.clone(),
            });
        }
    }

    plan
}
