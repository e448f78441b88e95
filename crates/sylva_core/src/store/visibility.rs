//! Visibility and filter engine.
//!
//! # Responsibility
//! - Decide node visibility from ancestor expansion and the filter predicate.
//! - Record filter matches into the filter-matched set on every recompute.
//!
//! # Invariants
//! - Detached nodes are never visible.
//! - A filter match bypasses the ancestor-expanded requirement.
//! - Filter results are not cached across recompute passes.

use super::propagation::FlagPass;
use super::TreeStore;
use crate::model::node::{NodeKey, NodeView};
use log::info;
use std::rc::Rc;

impl TreeStore {
    /// Whether every ancestor of `key` is expanded, memoised in `pass`.
    /// Each node inherits the answer from its parent.
    pub(crate) fn ancestors_expanded(&self, key: &NodeKey, pass: &mut FlagPass) -> bool {
        if let Some(open) = pass.open.get(key) {
            return *open;
        }
        let open = match self.parent(key) {
            Some(parent) => {
                self.maps.expanded.contains(parent) && self.ancestors_expanded(parent, pass)
            }
            None => true,
        };
        pass.open.insert(key.clone(), open);
        open
    }

    /// Evaluates the configured filter; `false` when none is installed.
    pub(crate) fn evaluate_filter(&self, key: &NodeKey) -> bool {
        let (Some(filter), Some(node)) = (self.config.filter.as_ref(), self.nodes.get(key)) else {
            return false;
        };
        filter(&node.view())
    }

    pub(crate) fn record_filter_match(&mut self, key: &NodeKey, matched: bool) {
        if matched {
            self.maps.filter_matched.insert(key.clone());
        } else {
            self.maps.filter_matched.remove(key);
        }
    }

    /// Whether `key` matched the filter during the last recompute.
    pub fn is_filter_matched(&self, key: &NodeKey) -> bool {
        self.maps.filter_matched.contains(key)
    }

    /// Filter-matched keys in pre-order.
    pub fn filter_matched_keys(&self) -> Vec<NodeKey> {
        self.keys_in(&self.maps.filter_matched)
    }

    /// Installs a filter predicate and recomputes every node.
    pub fn set_filter(&mut self, filter: impl Fn(&NodeView<'_>) -> bool + 'static) {
        self.config.filter = Some(Rc::new(filter));
        self.refresh_all();
        info!(
            "event=set_filter module=tree status=ok matched={}",
            self.maps.filter_matched.len()
        );
        self.refresh_view();
    }

    /// Removes the filter predicate and recomputes every node.
    pub fn clear_filter(&mut self) {
        self.config.filter = None;
        self.refresh_all();
        self.refresh_view();
    }
}
