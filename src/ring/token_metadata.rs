use std::collections::BTreeMap;
use std::sync::RwLock;

use super::ring_ranges;
use super::Endpoint;
use super::Range;
use super::Token;

/// The authoritative token -> endpoint mapping for live nodes, plus a
/// parallel mapping for nodes still bootstrapping (which must not yet
/// count as replicas). Mutated only by membership events; algorithms
/// read a cloned [`RingSnapshot`].
pub struct TokenMetadata {
    inner: RwLock<Maps>,
}

#[derive(Default)]
struct Maps {
    normal: BTreeMap<Token, Endpoint>,
    bootstrapping: BTreeMap<Token, Endpoint>,
}

impl TokenMetadata {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Maps::default()),
        }
    }

    /// Record `endpoint` at `token`. A `bootstrapping` entry is kept
    /// out of the replica-bearing map; flipping the flag moves the
    /// entry between the two maps.
    pub fn update(
        &self,
        token: Token,
        endpoint: Endpoint,
        bootstrapping: bool,
    ) {
        let mut maps = self.inner.write().unwrap();
        if bootstrapping {
            maps.normal.remove(&token);
            maps.bootstrapping.insert(token, endpoint);
        } else {
            maps.bootstrapping.remove(&token);
            maps.normal.insert(token, endpoint);
        }
    }

    pub fn remove(
        &self,
        token: &Token,
    ) {
        let mut maps = self.inner.write().unwrap();
        maps.normal.remove(token);
        maps.bootstrapping.remove(token);
    }

    /// Cloned view of the replica-bearing ring for read-only
    /// algorithms.
    pub fn snapshot(&self) -> RingSnapshot {
        let maps = self.inner.read().unwrap();
        RingSnapshot {
            map: maps.normal.clone(),
        }
    }

    pub fn bootstrapping_endpoints(&self) -> Vec<(Token, Endpoint)> {
        let maps = self.inner.read().unwrap();
        maps.bootstrapping.iter().map(|(t, e)| (*t, e.clone())).collect()
    }
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable-by-convention copy of the ring, cheap to clone and
/// safe to mutate locally while planning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RingSnapshot {
    map: BTreeMap<Token, Endpoint>,
}

impl RingSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Token, Endpoint)>) -> Self {
        Self {
            map: entries.into_iter().collect(),
        }
    }

    pub fn insert(
        &mut self,
        token: Token,
        endpoint: Endpoint,
    ) {
        self.map.insert(token, endpoint);
    }

    pub fn remove(
        &mut self,
        token: &Token,
    ) {
        self.map.remove(token);
    }

    pub fn endpoint_of(
        &self,
        token: &Token,
    ) -> Option<&Endpoint> {
        self.map.get(token)
    }

    pub fn token_of(
        &self,
        endpoint: &Endpoint,
    ) -> Option<Token> {
        self.map
            .iter()
            .find(|(_, e)| *e == endpoint)
            .map(|(t, _)| *t)
    }

    /// Tokens in ring order.
    pub fn tokens(&self) -> Vec<Token> {
        self.map.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Primary ranges of the current token set.
    pub fn ranges(&self) -> Vec<Range> {
        ring_ranges(&self.tokens())
    }

    /// The arc `endpoint` is primary for, if it owns a token.
    pub fn primary_range(
        &self,
        endpoint: &Endpoint,
    ) -> Option<Range> {
        let token = self.token_of(endpoint)?;
        self.ranges().into_iter().find(|r| r.right == token)
    }

    /// Endpoints in ring order starting from the owner of `from`,
    /// exclusive, walking clockwise and wrapping once.
    pub fn successors(
        &self,
        from: &Token,
    ) -> Vec<(Token, Endpoint)> {
        let after = self
            .map
            .range((std::ops::Bound::Excluded(*from), std::ops::Bound::Unbounded))
            .map(|(t, e)| (*t, e.clone()));
        let before = self
            .map
            .range((std::ops::Bound::Unbounded, std::ops::Bound::Included(*from)))
            .map(|(t, e)| (*t, e.clone()));
        after.chain(before).collect()
    }
}
