//! Activation engine with single or multiple selection.

use super::state_maps::StateSet;
use super::TreeStore;
use crate::model::node::NodeKey;
use log::debug;

impl TreeStore {
    /// Activated keys in pre-order.
    pub fn activated_keys(&self) -> Vec<NodeKey> {
        self.keys_in(&self.maps.activated)
    }

    pub fn preview_activated(&self, key: &NodeKey, activated: bool) -> Vec<NodeKey> {
        match self.next_activated_set(key, activated) {
            Some(next) => self.keys_in(&next),
            None => self.activated_keys(),
        }
    }

    /// Commits an activation change. Only nodes whose entry changed are
    /// recomputed; activation does not cascade.
    pub fn set_activated(&mut self, key: &NodeKey, activated: bool) -> Vec<NodeKey> {
        if self.apply_activated(key, activated) {
            self.refresh_view();
        }
        self.activated_keys()
    }

    /// Commits an activation change without rebuilding the view.
    pub(crate) fn apply_activated(&mut self, key: &NodeKey, activated: bool) -> bool {
        let Some(next) = self.next_activated_set(key, activated) else {
            debug!("event=set_activated module=tree status=skipped key={key}");
            return false;
        };
        let changed = self.maps.activated.changed_keys(&next);
        self.maps.activated = next;
        self.refresh_nodes(&changed);
        true
    }

    /// Flips the activated state. Disabled nodes are left alone.
    pub fn toggle_activated(&mut self, key: &NodeKey) -> Vec<NodeKey> {
        if !self.contains(key) || self.is_disabled(key) {
            return self.activated_keys();
        }
        let current = self.maps.activated.contains(key);
        self.set_activated(key, !current)
    }

    /// Replaces the activated set. Without `active_multiple` only the first
    /// attached key is kept.
    pub fn replace_activated(&mut self, keys: impl IntoIterator<Item = NodeKey>) -> Vec<NodeKey> {
        let limit = if self.options().active_multiple {
            usize::MAX
        } else {
            1
        };
        let next: StateSet = keys
            .into_iter()
            .filter(|key| self.contains(key))
            .take(limit)
            .collect();
        self.maps.activated = next;
        self.refresh_all();
        self.refresh_view();
        self.activated_keys()
    }

    pub(crate) fn next_activated_set(&self, key: &NodeKey, activated: bool) -> Option<StateSet> {
        if !self.is_activable(key) {
            return None;
        }
        if self.maps.activated.contains(key) == activated {
            return None;
        }
        let mut next = self.maps.activated.clone();
        if activated {
            if !self.options().active_multiple {
                next.clear();
            }
            next.insert(key.clone());
        } else {
            next.remove(key);
        }
        Some(next)
    }
}
