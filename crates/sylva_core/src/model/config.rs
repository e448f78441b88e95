//! Tree configuration.
//!
//! # Responsibility
//! - Hold tree-wide behavior defaults (`TreeOptions`) in a serde-friendly shape.
//! - Carry host callbacks (loader, filter, observer) next to the options.
//!
//! # Invariants
//! - Per-node overrides are OR'd with the matching option: a `true` option
//!   wins over a `false` override.
//! - `TreeOptions::default()` describes a plain tree: nothing checkable,
//!   nothing activable, no mutex, non-strict checking.

use crate::event::TreeObserver;
use crate::model::node::NodeView;
use crate::store::loader::ChildLoader;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Payload field names used when ingesting caller data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldKeys {
    pub children: String,
    pub label: String,
    pub value: String,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            children: "children".to_string(),
            label: "label".to_string(),
            value: "value".to_string(),
        }
    }
}

/// What a failed child fetch leaves behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailurePolicy {
    /// Return to `Unloaded` so a later expand fetches again.
    #[default]
    Retry,
    /// Settle on `NoChildren`; the node becomes a leaf.
    NoChildren,
}

/// Serializable tree-wide options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    pub keys: FieldKeys,
    pub checkable: bool,
    pub disabled: bool,
    pub activable: bool,
    pub draggable: bool,
    pub expand_mutex: bool,
    /// Checked state comes from explicit entries only.
    pub check_strictly: bool,
    pub active_multiple: bool,
    pub expand_all: bool,
    /// Nodes with `level < expand_level` start expanded.
    pub expand_level: usize,
    /// Expanding a node expands its ancestor chain too.
    pub expand_parent: bool,
    /// Defer child fetches until a node is expanded.
    pub lazy: bool,
    pub load_failure: LoadFailurePolicy,
}

/// Filter predicate evaluated against a node view.
pub type FilterFn = Rc<dyn Fn(&NodeView<'_>) -> bool>;

/// Options plus host callbacks.
#[derive(Clone, Default)]
pub struct TreeConfig {
    pub options: TreeOptions,
    pub(crate) loader: Option<Rc<dyn ChildLoader>>,
    pub(crate) filter: Option<FilterFn>,
    pub(crate) observer: Option<Rc<dyn TreeObserver>>,
}

impl TreeConfig {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Installs the child fetch function used by the lazy loader.
    pub fn with_loader(mut self, loader: impl ChildLoader + 'static) -> Self {
        self.loader = Some(Rc::new(loader));
        self
    }

    pub fn with_filter(mut self, filter: impl Fn(&NodeView<'_>) -> bool + 'static) -> Self {
        self.filter = Some(Rc::new(filter));
        self
    }

    /// Installs the event sink receiving load and update notifications.
    pub fn with_observer(mut self, observer: impl TreeObserver + 'static) -> Self {
        self.observer = Some(Rc::new(observer));
        self
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }
}

impl Debug for TreeConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeConfig")
            .field("options", &self.options)
            .field("loader", &self.loader.is_some())
            .field("filter", &self.filter.is_some())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
