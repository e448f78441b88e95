//! Flag propagation engine.
//!
//! # Responsibility
//! - Recompute cached `NodeFlags` from structure and the state sets.
//! - Walk exactly the closure an operator touched: self, descendants,
//!   ancestors, siblings.
//!
//! # Invariants
//! - Derivation reads the state sets, never other nodes' cached flags, so
//!   the order nodes are refreshed in cannot change the result.
//! - One refresh runs one `FlagPass`: every derived value is computed once
//!   and memoised, children settle before parents, ancestor facts are
//!   inherited from the parent instead of re-walking the chain.
//! - All flags of a pass are computed before any of them is written.

use super::TreeStore;
use crate::model::node::{Children, NodeFlags, NodeKey};
use std::collections::{HashMap, HashSet};

/// Memo of derived values for one refresh pass.
///
/// Only valid while structure and state sets stay untouched, and for one
/// checked set.
#[derive(Debug, Default)]
pub(crate) struct FlagPass {
    pub(super) levels: HashMap<NodeKey, usize>,
    pub(super) open: HashMap<NodeKey, bool>,
    pub(super) covered: HashMap<NodeKey, bool>,
    pub(super) checked: HashMap<NodeKey, (bool, bool)>,
}

impl TreeStore {
    /// Recomputes every cached flag of one node.
    pub(crate) fn update(&mut self, key: &NodeKey) {
        self.refresh_nodes(std::slice::from_ref(key));
    }

    /// Recomputes every cached flag of `keys` in one pass.
    ///
    /// Keys that are no longer attached are skipped.
    pub(crate) fn refresh_nodes(&mut self, keys: &[NodeKey]) {
        let mut pass = FlagPass::default();
        let computed: Vec<(NodeKey, NodeFlags, bool)> = keys
            .iter()
            .filter_map(|key| {
                let (flags, matched) = self.compute_flags(key, &mut pass)?;
                Some((key.clone(), flags, matched))
            })
            .collect();
        for (key, flags, matched) in computed {
            self.record_filter_match(&key, matched);
            if let Some(node) = self.nodes.get_mut(&key) {
                node.flags = flags;
            }
        }
    }

    /// Recomputes only checked and indeterminate flags of `keys`.
    pub(crate) fn update_checked(&mut self, keys: &[NodeKey]) {
        let mut pass = FlagPass::default();
        let computed: Vec<(NodeKey, (bool, bool))> = keys
            .iter()
            .map(|key| {
                let derived = self.derive_checked(key, &self.maps.checked, &mut pass);
                (key.clone(), derived)
            })
            .collect();
        for (key, (checked, indeterminate)) in computed {
            if let Some(node) = self.nodes.get_mut(&key) {
                node.flags.checked = checked;
                node.flags.indeterminate = indeterminate;
            }
        }
    }

    /// Recomputes every ancestor of `key`.
    pub(crate) fn update_parents(&mut self, key: &NodeKey) {
        let parents = self.parents(key);
        self.refresh_nodes(&parents);
    }

    /// Recomputes `key` and its whole subtree.
    pub(crate) fn update_children(&mut self, key: &NodeKey) {
        let subtree = self.subtree_keys(key);
        self.refresh_nodes(&subtree);
    }

    /// Recomputes `key`, its subtree and its ancestor chain.
    pub(crate) fn update_related(&mut self, key: &NodeKey) {
        self.update_keys(std::slice::from_ref(key));
    }

    /// Recomputes the union of related closures of `keys`, each node once.
    pub(crate) fn update_keys(&mut self, keys: &[NodeKey]) {
        let (mut touched, ancestors) = self.closure_of(keys);
        touched.extend(ancestors);
        self.refresh_nodes(&touched);
    }

    /// Splits the related closure of `roots` into subtree members and the
    /// ancestors outside every subtree. Each node is walked once.
    pub(crate) fn closure_of(&self, roots: &[NodeKey]) -> (Vec<NodeKey>, Vec<NodeKey>) {
        let mut in_subtree = HashSet::new();
        let mut subtrees = Vec::new();
        for root in roots {
            if !self.contains(root) {
                continue;
            }
            let mut stack = vec![root.clone()];
            while let Some(current) = stack.pop() {
                // A seen node brought its whole subtree along already.
                if !in_subtree.insert(current.clone()) {
                    continue;
                }
                stack.extend(self.children(&current).iter().rev().cloned());
                subtrees.push(current);
            }
        }

        let mut walked = HashSet::new();
        let mut ancestors = Vec::new();
        for root in roots {
            let mut cursor = self.parent(root);
            while let Some(parent) = cursor {
                if !walked.insert(parent.clone()) {
                    break;
                }
                if !in_subtree.contains(parent) {
                    ancestors.push(parent.clone());
                }
                cursor = self.parent(parent);
            }
        }
        (subtrees, ancestors)
    }

    /// Recomputes first/last flags of every node in the sibling list of
    /// `parent` (root list for `None`).
    pub(crate) fn update_sibling_list(&mut self, parent: Option<&NodeKey>) {
        let siblings = self.child_list(parent).to_vec();
        let last = siblings.len().saturating_sub(1);
        for (index, sibling) in siblings.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(sibling) {
                node.flags.is_first = index == 0;
                node.flags.is_last = index == last;
            }
        }
    }

    /// Recomputes every attached node.
    pub(crate) fn refresh_all(&mut self) {
        let keys = self.all_keys();
        self.refresh_nodes(&keys);
    }

    fn compute_flags(&self, key: &NodeKey, pass: &mut FlagPass) -> Option<(NodeFlags, bool)> {
        let node = self.nodes.get(key)?;
        let siblings = self.child_list(node.parent.as_ref());
        let is_leaf = match &node.children {
            Children::Unloaded => false,
            Children::NoChildren => true,
            Children::Loaded(keys) => keys.is_empty(),
        };
        let (checked, indeterminate) = self.derive_checked(key, &self.maps.checked, pass);
        let matched = self.evaluate_filter(key);
        let flags = NodeFlags {
            is_first: siblings.first() == Some(key),
            is_last: siblings.last() == Some(key),
            is_leaf,
            level: self.level_in(key, pass),
            loading: node.flags.loading,
            checked,
            expanded: self.maps.expanded.contains(key),
            activated: self.maps.activated.contains(key),
            indeterminate,
            visible: matched || self.ancestors_expanded(key, pass),
        };
        Some((flags, matched))
    }

    fn level_in(&self, key: &NodeKey, pass: &mut FlagPass) -> usize {
        if let Some(level) = pass.levels.get(key) {
            return *level;
        }
        let level = match self.parent(key) {
            Some(parent) => self.level_in(parent, pass) + 1,
            None => 0,
        };
        pass.levels.insert(key.clone(), level);
        level
    }
}

#[cfg(test)]
mod tests {
    use super::FlagPass;
    use crate::model::config::{TreeConfig, TreeOptions};
    use crate::model::node::NodeKey;
    use crate::store::TreeStore;
    use serde_json::{json, Value};

    fn key(value: &str) -> NodeKey {
        NodeKey::from(value)
    }

    fn synthetic_store() -> TreeStore {
        TreeStore::with_data(
            TreeConfig::new(TreeOptions {
                checkable: true,
                ..TreeOptions::default()
            }),
            vec![json!({
                "value": "root",
                "children": [
                    {"value": "a", "children": [{"value": "a1"}, {"value": "a2"}]},
                    {"value": "b"}
                ]
            })],
        )
        .unwrap()
    }

    fn chain(depth: usize) -> Value {
        let mut value = json!({"value": format!("n{}", depth - 1)});
        for index in (0..depth - 1).rev() {
            value = json!({"value": format!("n{index}"), "children": [value]});
        }
        value
    }

    #[test]
    fn update_reads_state_sets_not_cached_flags() {
        let mut store = synthetic_store();
        store.maps.checked.insert(key("a1"));
        store.maps.checked.insert(key("a2"));

        // Refresh the parent before its children: the parent still derives
        // from the set directly.
        store.update(&key("a"));
        assert!(store.node(&key("a")).unwrap().flags().checked);
        assert!(!store.node(&key("a1")).unwrap().flags().checked);

        store.update_children(&key("a"));
        assert!(store.node(&key("a1")).unwrap().flags().checked);
    }

    #[test]
    fn update_keys_covers_ancestors_once() {
        let mut store = synthetic_store();
        store.maps.checked.insert(key("a1"));

        store.update_keys(&[key("a1"), key("a1")]);
        assert!(store.is_checked(&key("a1")));
        assert!(store.is_indeterminate(&key("a")));
        assert!(store.is_indeterminate(&key("root")));
        assert!(!store.is_checked(&key("root")));
    }

    #[test]
    fn closure_walks_each_node_once() {
        let store = synthetic_store();

        let (subtrees, ancestors) = store.closure_of(&[key("a1"), key("a"), key("a2"), key("b")]);

        assert_eq!(subtrees.len(), 4);
        assert!(subtrees.contains(&key("a")) && subtrees.contains(&key("a2")));
        assert_eq!(ancestors, vec![key("root")]);
    }

    #[test]
    fn sibling_list_refresh_follows_a_manual_splice() {
        let mut store = synthetic_store();
        let list = store.child_list_mut(Some(&key("root"))).unwrap();
        list.retain(|sibling| sibling != &key("b"));
        list.insert(0, key("b"));

        store.update_sibling_list(Some(&key("root")));

        assert!(store.is_first(&key("b")) && !store.is_last(&key("b")));
        assert!(store.is_last(&key("a")) && !store.is_first(&key("a")));
    }

    #[test]
    fn one_pass_derives_a_deep_chain() {
        let mut store = TreeStore::with_data(
            TreeConfig::new(TreeOptions {
                checkable: true,
                ..TreeOptions::default()
            }),
            vec![chain(500)],
        )
        .unwrap();
        store.maps.checked.insert(key("n499"));

        let mut pass = FlagPass::default();
        let derived = store.derive_checked(&key("n0"), &store.maps.checked, &mut pass);
        assert_eq!(derived, (true, false));
        assert_eq!(pass.checked.len(), 500);

        store.refresh_all();
        assert!(store.is_checked(&key("n0")));
        assert_eq!(store.node(&key("n499")).unwrap().flags().level, 499);
    }
}
