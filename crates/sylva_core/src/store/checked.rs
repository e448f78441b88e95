//! Checked / indeterminate engine.
//!
//! # Responsibility
//! - Derive checked and indeterminate values against the live or a
//!   hypothetical checked set.
//! - Offer a pure preview and a committing entry point for check changes.
//!
//! # Invariants
//! - Non-strict: a node is checked when explicitly present, when all its
//!   loaded children are checked, or (without loaded children) when any
//!   ancestor is explicitly present.
//! - Strict: presence is the only source of truth and nothing is
//!   indeterminate.
//! - A non-strict commit leaves no explicit entry on any ancestor of the
//!   toggled node.

use super::propagation::FlagPass;
use super::state_maps::StateSet;
use super::TreeStore;
use crate::model::node::NodeKey;
use log::debug;
use std::collections::HashSet;

impl TreeStore {
    /// Derived checked value of `key` against `set`.
    pub fn is_checked_in(&self, key: &NodeKey, set: &StateSet) -> bool {
        self.derive_checked(key, set, &mut FlagPass::default()).0
    }

    /// Derived indeterminate value of `key` against `set`.
    pub fn is_indeterminate_in(&self, key: &NodeKey, set: &StateSet) -> bool {
        self.derive_checked(key, set, &mut FlagPass::default()).1
    }

    /// Derived `(checked, indeterminate)` of `key` against `set`, memoised
    /// in `pass`. Children are derived before their parent.
    pub(crate) fn derive_checked(
        &self,
        key: &NodeKey,
        set: &StateSet,
        pass: &mut FlagPass,
    ) -> (bool, bool) {
        if let Some(derived) = pass.checked.get(key) {
            return *derived;
        }
        let derived = if self.options().check_strictly {
            (set.contains(key), false)
        } else {
            let children = self.children(key);
            let mut all_checked = true;
            let mut any_checked = false;
            let mut any_indeterminate = false;
            for child in children {
                let (checked, indeterminate) = self.derive_checked(child, set, pass);
                all_checked &= checked;
                any_checked |= checked;
                any_indeterminate |= indeterminate;
            }
            let checked = if set.contains(key) {
                true
            } else if !children.is_empty() {
                all_checked
            } else {
                self.covered_in(key, set, pass)
            };
            (checked, any_indeterminate || (any_checked && !all_checked))
        };
        pass.checked.insert(key.clone(), derived);
        derived
    }

    /// Whether any ancestor of `key` is explicitly present in `set`.
    fn covered_in(&self, key: &NodeKey, set: &StateSet, pass: &mut FlagPass) -> bool {
        if let Some(covered) = pass.covered.get(key) {
            return *covered;
        }
        let covered = match self.parent(key) {
            Some(parent) => set.contains(parent) || self.covered_in(parent, set, pass),
            None => false,
        };
        pass.covered.insert(key.clone(), covered);
        covered
    }

    /// Derived-checked keys in pre-order.
    pub fn checked_keys(&self) -> Vec<NodeKey> {
        self.checked_keys_in(&self.maps.checked)
    }

    /// Derived-checked keys in pre-order against a hypothetical set.
    pub fn checked_keys_in(&self, set: &StateSet) -> Vec<NodeKey> {
        let mut pass = FlagPass::default();
        self.all_keys()
            .into_iter()
            .filter(|key| self.derive_checked(key, set, &mut pass).0)
            .collect()
    }

    /// Computes the checked keys that `set_checked` would produce, without
    /// touching the store.
    pub fn preview_checked(&self, key: &NodeKey, checked: bool) -> Vec<NodeKey> {
        match self.next_checked_set(key, checked) {
            Some(next) => self.checked_keys_in(&next),
            None => self.checked_keys(),
        }
    }

    /// Commits a check change and propagates it.
    ///
    /// Returns the derived-checked keys after the call. Unknown keys,
    /// non-checkable nodes and unchanged values are no-ops.
    pub fn set_checked(&mut self, key: &NodeKey, checked: bool) -> Vec<NodeKey> {
        if self.apply_checked(key, checked) {
            self.refresh_view();
        }
        self.checked_keys()
    }

    /// Flips the derived checked value. Disabled nodes are left alone.
    pub fn toggle_checked(&mut self, key: &NodeKey) -> Vec<NodeKey> {
        if !self.contains(key) || self.is_disabled(key) {
            return self.checked_keys();
        }
        let current = self.is_checked_in(key, &self.maps.checked);
        self.set_checked(key, !current)
    }

    /// Replaces the explicit checked set. Unknown keys are dropped.
    pub fn replace_checked(&mut self, keys: impl IntoIterator<Item = NodeKey>) -> Vec<NodeKey> {
        let next: StateSet = keys.into_iter().filter(|key| self.contains(key)).collect();
        self.maps.checked = next;
        self.refresh_all();
        self.refresh_view();
        self.checked_keys()
    }

    /// Builds the checked set resulting from setting `key` to `checked`.
    ///
    /// Returns `None` when the change is a no-op.
    pub(crate) fn next_checked_set(&self, key: &NodeKey, checked: bool) -> Option<StateSet> {
        if !self.is_checkable(key) {
            return None;
        }
        let current = &self.maps.checked;
        if self.is_checked_in(key, current) == checked {
            return None;
        }

        let mut next = current.clone();
        if self.options().check_strictly {
            if checked {
                next.insert(key.clone());
            } else {
                next.remove(key);
            }
            return Some(next);
        }

        let ancestors = self.parents(key);
        let subtree = self.subtree_keys(key);

        // Nodes checked only through an explicit ancestor keep their value
        // once that ancestor entry is dropped.
        if let Some(top) = ancestors.iter().rev().find(|parent| current.contains(parent)) {
            let skip: HashSet<&NodeKey> = ancestors.iter().chain(subtree.iter()).collect();
            for descendant in self.subtree_keys(top) {
                if !skip.contains(&descendant) {
                    next.insert(descendant);
                }
            }
        }
        for parent in &ancestors {
            next.remove(parent);
        }
        for descendant in subtree {
            if checked {
                next.insert(descendant);
            } else {
                next.remove(&descendant);
            }
        }
        Some(next)
    }

    /// Commits and propagates a check change without rebuilding the view.
    ///
    /// Returns whether the checked set changed.
    pub(crate) fn apply_checked(&mut self, key: &NodeKey, checked: bool) -> bool {
        let Some(next) = self.next_checked_set(key, checked) else {
            debug!("event=set_checked module=tree status=skipped key={key}");
            return false;
        };
        let changed = self.commit_checked_set(next);
        self.propagate_checked(key, &changed);
        true
    }

    /// Swaps in `next` and returns the keys whose explicit entry changed.
    pub(crate) fn commit_checked_set(&mut self, next: StateSet) -> Vec<NodeKey> {
        let changed = self.maps.checked.changed_keys(&next);
        self.maps.checked = next;
        changed
    }

    /// Refreshes the closure of a checked commit: touched subtrees fully,
    /// ancestor chains for checked/indeterminate only.
    pub(crate) fn propagate_checked(&mut self, key: &NodeKey, changed: &[NodeKey]) {
        let mut roots = Vec::with_capacity(changed.len() + 1);
        roots.push(key.clone());
        roots.extend(changed.iter().cloned());
        let (subtrees, ancestors) = self.closure_of(&roots);
        self.refresh_nodes(&subtrees);
        self.update_checked(&ancestors);
    }
}
