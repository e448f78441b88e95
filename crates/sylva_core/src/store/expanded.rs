//! Expansion engine with sibling mutex.
//!
//! # Invariants
//! - When the governing node of a candidate has mutex enabled, the candidate
//!   and its siblings are never expanded at the same time. The governing
//!   node is the candidate itself when root-level, else its parent.
//! - With `expand_parent`, candidates are processed leaf-to-root.
//! - Payload seeds obey the same mutex: the first seeded sibling wins.

use super::state_maps::StateSet;
use super::TreeStore;
use crate::model::node::NodeKey;
use log::debug;

impl TreeStore {
    /// Expanded keys in pre-order.
    pub fn expanded_keys(&self) -> Vec<NodeKey> {
        self.keys_in(&self.maps.expanded)
    }

    /// Computes the expanded keys `set_expanded` would produce.
    pub fn preview_expanded(&self, key: &NodeKey, expanded: bool) -> Vec<NodeKey> {
        match self.next_expanded_set(key, expanded) {
            Some(next) => self.keys_in(&next),
            None => self.expanded_keys(),
        }
    }

    /// Commits an expand/collapse and propagates visibility.
    ///
    /// Expanding a node whose children are still unloaded starts a fetch,
    /// also when the node is already expanded.
    pub fn set_expanded(&mut self, key: &NodeKey, expanded: bool) -> Vec<NodeKey> {
        if self.apply_expanded(key, expanded) {
            self.refresh_view();
        }
        self.expanded_keys()
    }

    /// Commits an expand/collapse without rebuilding the view.
    ///
    /// Returns whether the expanded set changed or a fetch started.
    pub(crate) fn apply_expanded(&mut self, key: &NodeKey, expanded: bool) -> bool {
        let Some(next) = self.next_expanded_set(key, expanded) else {
            if expanded && self.maps.expanded.contains(key) && self.load_children(key) {
                return true;
            }
            debug!("event=set_expanded module=tree status=skipped key={key}");
            return false;
        };
        let changed = self.maps.expanded.changed_keys(&next);
        self.maps.expanded = next;

        self.update(key);
        if expanded
            && self
                .nodes
                .get(key)
                .is_some_and(|node| node.children.is_unloaded())
        {
            self.load_children(key);
        }
        self.update_keys(&changed);
        true
    }

    /// Adds a payload-seeded expanded entry.
    ///
    /// Entries already present win, and under a mutex governing node the
    /// first expanded sibling wins. Returns whether the entry was added.
    pub(crate) fn seed_expanded(&mut self, key: &NodeKey) -> bool {
        if !self.contains(key) || self.maps.expanded.contains(key) {
            return false;
        }
        let governing = self.parent(key).unwrap_or(key);
        if self.is_expand_mutex(governing)
            && self
                .siblings(key)
                .iter()
                .any(|sibling| sibling != key && self.maps.expanded.contains(sibling))
        {
            debug!("event=seed_expanded module=tree status=skipped reason=mutex key={key}");
            return false;
        }
        self.maps.expanded.insert(key.clone())
    }

    /// Flips the expanded state. Disabled nodes are left alone.
    pub fn toggle_expanded(&mut self, key: &NodeKey) -> Vec<NodeKey> {
        if !self.contains(key) || self.is_disabled(key) {
            return self.expanded_keys();
        }
        let current = self.maps.expanded.contains(key);
        self.set_expanded(key, !current)
    }

    /// Replaces the expanded set. Unknown keys are dropped; no fetch starts.
    pub fn replace_expanded(&mut self, keys: impl IntoIterator<Item = NodeKey>) -> Vec<NodeKey> {
        let next: StateSet = keys.into_iter().filter(|key| self.contains(key)).collect();
        self.maps.expanded = next;
        self.refresh_all();
        self.refresh_view();
        self.expanded_keys()
    }

    pub(crate) fn next_expanded_set(&self, key: &NodeKey, expanded: bool) -> Option<StateSet> {
        if !self.contains(key) {
            return None;
        }
        let mut next = self.maps.expanded.clone();
        if !expanded {
            return next.remove(key).then_some(next);
        }

        let mut candidates = vec![key.clone()];
        if self.options().expand_parent {
            candidates.extend(self.parents(key));
        }
        for candidate in &candidates {
            let governing = self.parent(candidate).unwrap_or(candidate);
            if self.is_expand_mutex(governing) {
                for sibling in self.siblings(candidate) {
                    if sibling != candidate {
                        next.remove(sibling);
                    }
                }
            }
            next.insert(candidate.clone());
        }
        (next != self.maps.expanded).then_some(next)
    }

    /// Keys present in `set`, in pre-order.
    pub(crate) fn keys_in(&self, set: &StateSet) -> Vec<NodeKey> {
        self.all_keys()
            .into_iter()
            .filter(|key| set.contains(key))
            .collect()
    }
}
