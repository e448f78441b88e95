//! Presence-only state sets.
//!
//! # Invariants
//! - Presence means `true`, absence means `false`; no other value is stored.
//! - Iteration order is the key order, so snapshots compare deterministically.

use crate::model::node::NodeKey;
use serde::Serialize;
use std::collections::BTreeSet;

/// One presence set keyed by node identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StateSet(BTreeSet<NodeKey>);

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.0.contains(key)
    }

    /// Returns whether the key was newly added.
    pub fn insert(&mut self, key: NodeKey) -> bool {
        self.0.insert(key)
    }

    /// Returns whether the key was present.
    pub fn remove(&mut self, key: &NodeKey) -> bool {
        self.0.remove(key)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeKey> {
        self.0.iter()
    }

    /// Keys present in exactly one of the two sets.
    pub fn changed_keys(&self, other: &StateSet) -> Vec<NodeKey> {
        self.0.symmetric_difference(&other.0).cloned().collect()
    }
}

impl FromIterator<NodeKey> for StateSet {
    fn from_iter<I: IntoIterator<Item = NodeKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The four authoritative state projections of a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateMaps {
    pub checked: StateSet,
    pub expanded: StateSet,
    pub activated: StateSet,
    pub filter_matched: StateSet,
}

impl StateMaps {
    /// Drops one identity from every set.
    pub fn purge(&mut self, key: &NodeKey) {
        self.checked.remove(key);
        self.expanded.remove(key);
        self.activated.remove(key);
        self.filter_matched.remove(key);
    }

    /// Returns whether any set still mentions the identity.
    pub fn mentions(&self, key: &NodeKey) -> bool {
        self.checked.contains(key)
            || self.expanded.contains(key)
            || self.activated.contains(key)
            || self.filter_matched.contains(key)
    }
}
