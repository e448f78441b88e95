//! Tree store: node index, state sets and the operators working on them.
//!
//! # Responsibility
//! - Own every attached node, the root list and the four state sets.
//! - Expose read-only structural and state queries by node key.
//! - Rebuild the flattened visible row list and notify the observer.
//!
//! # Invariants
//! - A node is attached iff it is in `nodes`; `nodes` holds exactly the nodes
//!   reachable from `roots`.
//! - State sets only mention attached keys.
//! - Operators finish relinking before any propagation runs.
//!
//! # See also
//! - `propagation` for flag recompute routines.
//! - `mutation` for structural operators.

pub mod activated;
pub mod checked;
pub mod expanded;
pub mod loader;
pub mod mutation;
pub mod propagation;
pub mod state_maps;
pub mod visibility;

use crate::error::{TreeError, TreeResult};
use crate::event::TreeEvent;
use crate::model::config::{TreeConfig, TreeOptions};
use crate::model::node::{LoaderState, Node, NodeKey, NodeView};
use crate::snapshot::{SnapshotNode, TreeSnapshot};
use loader::PendingLoad;
use log::debug;
use serde_json::Value;
use state_maps::StateMaps;
use std::collections::{HashMap, HashSet};

/// Authoritative owner of one tree.
#[derive(Debug)]
pub struct TreeStore {
    config: TreeConfig,
    roots: Vec<NodeKey>,
    nodes: HashMap<NodeKey, Node>,
    maps: StateMaps,
    visible_rows: Vec<NodeKey>,
    pending_loads: Vec<PendingLoad>,
}

impl TreeStore {
    /// Creates an empty store.
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            roots: Vec::new(),
            nodes: HashMap::new(),
            maps: StateMaps::default(),
            visible_rows: Vec::new(),
            pending_loads: Vec::new(),
        }
    }

    /// Creates a store and ingests `data` as root-level nodes.
    pub fn with_data(config: TreeConfig, data: Vec<Value>) -> TreeResult<Self> {
        let mut store = Self::new(config);
        store.append_data(None, data)?;
        Ok(store)
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn options(&self) -> &TreeOptions {
        &self.config.options
    }

    /// Replaces tree-wide options and recomputes every node.
    pub fn set_options(&mut self, options: TreeOptions) {
        self.config.options = options;
        self.refresh_all();
        self.refresh_view();
    }

    pub fn state(&self) -> &StateMaps {
        &self.maps
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn node(&self, key: &NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn view(&self, key: &NodeKey) -> Option<NodeView<'_>> {
        self.nodes.get(key).map(Node::view)
    }

    pub fn roots(&self) -> &[NodeKey] {
        self.roots.as_slice()
    }

    /// Loaded children of `key`; empty for unknown, unloaded or leaf nodes.
    pub fn children(&self, key: &NodeKey) -> &[NodeKey] {
        self.nodes
            .get(key)
            .map(|node| node.children.keys())
            .unwrap_or(&[])
    }

    pub fn parent(&self, key: &NodeKey) -> Option<&NodeKey> {
        self.nodes.get(key).and_then(|node| node.parent.as_ref())
    }

    /// Ancestors ordered nearest first.
    pub fn parents(&self, key: &NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.parent(key);
        while let Some(current) = cursor {
            // A corrupted index must not loop forever.
            if !seen.insert(current) {
                break;
            }
            out.push(current.clone());
            cursor = self.parent(current);
        }
        out
    }

    /// Keys from the root-level ancestor down to `key` itself.
    pub fn path(&self, key: &NodeKey) -> Vec<NodeKey> {
        if !self.contains(key) {
            return Vec::new();
        }
        let mut out = self.parents(key);
        out.reverse();
        out.push(key.clone());
        out
    }

    /// Root-level ancestor of `key` (the key itself when root-level).
    pub fn root_of(&self, key: &NodeKey) -> Option<NodeKey> {
        self.path(key).into_iter().next()
    }

    /// Sibling list containing `key`, including `key` itself.
    pub fn siblings(&self, key: &NodeKey) -> &[NodeKey] {
        match self.nodes.get(key) {
            Some(node) => self.child_list(node.parent.as_ref()),
            None => &[],
        }
    }

    pub fn index_of(&self, key: &NodeKey) -> Option<usize> {
        self.siblings(key).iter().position(|sibling| sibling == key)
    }

    pub fn level(&self, key: &NodeKey) -> Option<usize> {
        self.contains(key).then(|| self.parents(key).len())
    }

    pub fn is_first(&self, key: &NodeKey) -> bool {
        self.flag(key, |node| node.flags.is_first)
    }

    pub fn is_last(&self, key: &NodeKey) -> bool {
        self.flag(key, |node| node.flags.is_last)
    }

    pub fn is_leaf(&self, key: &NodeKey) -> bool {
        self.flag(key, |node| node.flags.is_leaf)
    }

    pub fn is_checked(&self, key: &NodeKey) -> bool {
        self.flag(key, |node| node.flags.checked)
    }

    pub fn is_indeterminate(&self, key: &NodeKey) -> bool {
        self.flag(key, |node| node.flags.indeterminate)
    }

    pub fn is_expanded(&self, key: &NodeKey) -> bool {
        self.flag(key, |node| node.flags.expanded)
    }

    pub fn is_activated(&self, key: &NodeKey) -> bool {
        self.flag(key, |node| node.flags.activated)
    }

    pub fn is_visible(&self, key: &NodeKey) -> bool {
        self.flag(key, |node| node.flags.visible)
    }

    pub fn is_loading(&self, key: &NodeKey) -> bool {
        self.flag(key, |node| node.flags.loading)
    }

    pub fn is_disabled(&self, key: &NodeKey) -> bool {
        self.options().disabled || self.flag(key, |node| node.overrides.disabled)
    }

    pub fn is_checkable(&self, key: &NodeKey) -> bool {
        self.contains(key)
            && (self.options().checkable || self.flag(key, |node| node.overrides.checkable))
    }

    pub fn is_activable(&self, key: &NodeKey) -> bool {
        self.contains(key)
            && (self.options().activable || self.flag(key, |node| node.overrides.activable))
    }

    pub fn is_draggable(&self, key: &NodeKey) -> bool {
        self.contains(key)
            && (self.options().draggable || self.flag(key, |node| node.overrides.draggable))
    }

    /// Whether expanding one child of `key` collapses its siblings.
    pub fn is_expand_mutex(&self, key: &NodeKey) -> bool {
        self.contains(key)
            && (self.options().expand_mutex || self.flag(key, |node| node.overrides.expand_mutex))
    }

    pub fn loader_state(&self, key: &NodeKey) -> Option<LoaderState> {
        self.nodes.get(key).map(Node::loader_state)
    }

    /// Every attached key in pre-order.
    pub fn all_keys(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.collect_subtree(root, &mut out);
        }
        out
    }

    /// Flattened visible rows in pre-order, as of the last rebuild.
    pub fn visible_keys(&self) -> &[NodeKey] {
        self.visible_rows.as_slice()
    }

    /// Serializable copy of structure, cached flags and state sets.
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            roots: self
                .roots
                .iter()
                .filter_map(|key| self.snapshot_node(key))
                .collect(),
            checked: self.maps.checked.iter().cloned().collect(),
            expanded: self.maps.expanded.iter().cloned().collect(),
            activated: self.maps.activated.iter().cloned().collect(),
            filter_matched: self.maps.filter_matched.iter().cloned().collect(),
        }
    }

    fn snapshot_node(&self, key: &NodeKey) -> Option<SnapshotNode> {
        let node = self.nodes.get(key)?;
        Some(SnapshotNode {
            key: node.key.clone(),
            label: node.label.clone(),
            loader: node.loader_state(),
            flags: node.flags,
            children: node
                .children
                .keys()
                .iter()
                .filter_map(|child| self.snapshot_node(child))
                .collect(),
        })
    }

    /// `key` and all its attached descendants in pre-order.
    pub(crate) fn subtree_keys(&self, key: &NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect_subtree(key, &mut out);
        out
    }

    fn collect_subtree(&self, key: &NodeKey, out: &mut Vec<NodeKey>) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        out.push(key.clone());
        for child in node.children.keys() {
            self.collect_subtree(child, out);
        }
    }

    /// Child list of `parent`, or the root list for `None`.
    pub(crate) fn child_list(&self, parent: Option<&NodeKey>) -> &[NodeKey] {
        match parent {
            None => self.roots.as_slice(),
            Some(key) => self.children(key),
        }
    }

    /// Mutable child list of `parent`, loading sentinel children on demand.
    pub(crate) fn child_list_mut(
        &mut self,
        parent: Option<&NodeKey>,
    ) -> TreeResult<&mut Vec<NodeKey>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(key) => self
                .nodes
                .get_mut(key)
                .map(|node| node.children.ensure_loaded())
                .ok_or_else(|| TreeError::NodeNotFound(key.clone())),
        }
    }

    pub(crate) fn require(&self, key: &NodeKey) -> TreeResult<&Node> {
        self.nodes
            .get(key)
            .ok_or_else(|| TreeError::NodeNotFound(key.clone()))
    }

    fn flag(&self, key: &NodeKey, read: impl Fn(&Node) -> bool) -> bool {
        self.nodes.get(key).map(read).unwrap_or(false)
    }

    /// Rebuilds the flattened visible rows and notifies the observer.
    pub(crate) fn refresh_view(&mut self) {
        let rows: Vec<NodeKey> = self
            .all_keys()
            .into_iter()
            .filter(|key| self.is_visible(key))
            .collect();
        debug!(
            "event=view_rebuild module=tree status=ok nodes={} visible={}",
            self.nodes.len(),
            rows.len()
        );
        self.visible_rows = rows;
        self.emit(&TreeEvent::Updated);
    }

    pub(crate) fn emit(&self, event: &TreeEvent) {
        if let Some(observer) = self.config.observer.as_ref() {
            observer.on_event(event);
        }
    }
}
