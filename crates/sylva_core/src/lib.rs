//! Core engine for hierarchical trees with checked, expanded, activated and
//! filter-matched state projections.
//! This crate is the single source of truth for tree state invariants.

pub mod error;
pub mod event;
pub mod filter;
pub mod logging;
pub mod model;
pub mod snapshot;
pub mod store;

pub use error::{TreeError, TreeResult};
pub use event::{LoadOutcome, TreeEvent, TreeObserver};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status};
pub use model::config::{FieldKeys, FilterFn, LoadFailurePolicy, TreeConfig, TreeOptions};
pub use model::node::{
    Children, LoaderState, Node, NodeFlags, NodeKey, NodeOverrides, NodeUpdate, NodeView,
};
pub use snapshot::{SnapshotNode, TreeSnapshot};
pub use store::loader::{ChildLoader, LoadCompletion, LoadError, LoadFuture, PendingLoad};
pub use store::mutation::Insertion;
pub use store::state_maps::{StateMaps, StateSet};
pub use store::TreeStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
