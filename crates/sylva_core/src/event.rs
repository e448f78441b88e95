//! Store event notifications.
//!
//! # Responsibility
//! - Define events emitted by the store to its host.
//! - Provide the observer seam the rendering layer plugs into.
//!
//! # Invariants
//! - `Load` is emitted after every completed fetch attempt, whatever the outcome.
//! - `Updated` is emitted after every operator that changed structure or a
//!   state set, once the flattened view has been rebuilt.

use crate::model::node::NodeKey;
use serde_json::Value;

/// Terminal result of one lazy-load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Non-empty list appended as children.
    Loaded,
    /// Empty list; node settled on `NoChildren`.
    NoChildren,
    /// Fetch or ingestion failed; failure policy applied.
    Failed,
}

/// Event emitted by `TreeStore`.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    Load {
        key: NodeKey,
        data: Vec<Value>,
        outcome: LoadOutcome,
    },
    Updated,
}

/// Event sink installed through `TreeConfig::with_observer`.
pub trait TreeObserver {
    fn on_event(&self, event: &TreeEvent);
}

impl<F> TreeObserver for F
where
    F: Fn(&TreeEvent),
{
    fn on_event(&self, event: &TreeEvent) {
        self(event)
    }
}
