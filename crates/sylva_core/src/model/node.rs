//! Tree node model.
//!
//! # Responsibility
//! - Define the per-node record owned by `TreeStore`.
//! - Keep structural links as identity keys instead of owning references.
//!
//! # Invariants
//! - `key` is stable for the node lifetime and unique inside one store.
//! - `parent` is a lookup key into the store index, never an owner.
//! - `flags` are caches written by the propagation engine only; the state
//!   sets on the store stay authoritative.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable node identity used as key for the index and every state set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Creates a key from a caller-provided identity.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a fresh random identity for payloads without one.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Reads identity from a payload field. Strings and numbers are accepted.
    pub(crate) fn from_payload_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Self(text.clone())),
            Value::Number(number) => Some(Self(number.to_string())),
            _ => None,
        }
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Child list shape of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    /// Children exist but have not been fetched yet.
    Unloaded,
    /// Node is known to have no children.
    NoChildren,
    /// Ordered child keys. May be empty after removals.
    Loaded(Vec<NodeKey>),
}

impl Children {
    /// Returns loaded child keys, or an empty slice for the other shapes.
    pub fn keys(&self) -> &[NodeKey] {
        match self {
            Self::Loaded(keys) => keys.as_slice(),
            Self::Unloaded | Self::NoChildren => &[],
        }
    }

    /// Returns whether at least one child is loaded.
    pub fn has_loaded(&self) -> bool {
        matches!(self, Self::Loaded(keys) if !keys.is_empty())
    }

    pub fn is_unloaded(&self) -> bool {
        matches!(self, Self::Unloaded)
    }

    /// Converts any shape into a loaded list and returns it mutably.
    pub(crate) fn ensure_loaded(&mut self) -> &mut Vec<NodeKey> {
        if !matches!(self, Self::Loaded(_)) {
            *self = Self::Loaded(Vec::new());
        }
        match self {
            Self::Loaded(keys) => keys,
            Self::Unloaded | Self::NoChildren => unreachable!("children were just loaded"),
        }
    }
}

/// Projection of the lazy loader state machine for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderState {
    Unloaded,
    Loading,
    Loaded,
    NoChildren,
}

/// Per-node behavior overrides, OR'd with the tree-wide options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeOverrides {
    pub expand_mutex: bool,
    pub activable: bool,
    pub checkable: bool,
    pub disabled: bool,
    pub draggable: bool,
}

/// Cached view flags recomputed by the propagation engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeFlags {
    pub is_first: bool,
    pub is_last: bool,
    pub is_leaf: bool,
    /// Depth from the root list (root-level nodes are level 0).
    pub level: usize,
    pub loading: bool,
    pub checked: bool,
    pub expanded: bool,
    pub activated: bool,
    pub indeterminate: bool,
    pub visible: bool,
}

/// One tree vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) key: NodeKey,
    pub(crate) label: String,
    pub(crate) payload: Value,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Children,
    pub(crate) overrides: NodeOverrides,
    pub(crate) flags: NodeFlags,
}

impl Node {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Caller payload without the children field.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn parent(&self) -> Option<&NodeKey> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn overrides(&self) -> NodeOverrides {
        self.overrides
    }

    /// Last computed view flags. Stale once the node is detached.
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn loader_state(&self) -> LoaderState {
        if self.flags.loading {
            return LoaderState::Loading;
        }
        match self.children {
            Children::Unloaded => LoaderState::Unloaded,
            Children::NoChildren => LoaderState::NoChildren,
            Children::Loaded(_) => LoaderState::Loaded,
        }
    }

    /// Borrowed read-only view handed to filters and loaders.
    pub fn view(&self) -> NodeView<'_> {
        NodeView {
            key: &self.key,
            label: self.label.as_str(),
            payload: &self.payload,
            parent: self.parent.as_ref(),
            flags: self.flags,
            loader: self.loader_state(),
        }
    }
}

/// External view model of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeView<'a> {
    pub key: &'a NodeKey,
    pub label: &'a str,
    pub payload: &'a Value,
    pub parent: Option<&'a NodeKey>,
    pub flags: NodeFlags,
    pub loader: LoaderState,
}

/// Explicit set of mutable node fields accepted by `TreeStore::update_node`.
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    pub label: Option<String>,
    pub disabled: Option<bool>,
    pub checkable: Option<bool>,
    pub draggable: Option<bool>,
    pub expand_mutex: Option<bool>,
    pub activable: Option<bool>,
    pub checked: Option<bool>,
    pub expanded: Option<bool>,
    pub actived: Option<bool>,
    pub loading: Option<bool>,
}
