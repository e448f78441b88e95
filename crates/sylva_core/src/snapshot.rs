//! Serializable tree snapshots.
//!
//! Used to compare whole-tree state before and after an operation and to
//! hand a JSON rendering of the tree to tooling.

use crate::model::node::{LoaderState, NodeFlags, NodeKey};
use serde::Serialize;

/// One node with its attached descendants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotNode {
    pub key: NodeKey,
    pub label: String,
    pub loader: LoaderState,
    pub flags: NodeFlags,
    pub children: Vec<SnapshotNode>,
}

/// Structure plus state sets of one store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeSnapshot {
    pub roots: Vec<SnapshotNode>,
    pub checked: Vec<NodeKey>,
    pub expanded: Vec<NodeKey>,
    pub activated: Vec<NodeKey>,
    pub filter_matched: Vec<NodeKey>,
}

impl TreeSnapshot {
    /// Number of nodes in the snapshot.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[SnapshotNode]) -> usize {
            nodes.iter().map(|node| 1 + count(&node.children)).sum()
        }
        count(&self.roots)
    }
}
