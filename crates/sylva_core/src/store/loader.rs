//! Lazy child loader.
//!
//! # Responsibility
//! - Drive the per-node state machine
//!   `Unloaded -> Loading -> Loaded | NoChildren`.
//! - Keep the fetch itself outside the store: starting a load parks a
//!   `PendingLoad`, the host awaits it and hands the result back.
//!
//! # Invariants
//! - At most one fetch is in flight per node (`loading` guard); re-entry
//!   is a no-op.
//! - `complete_load` always clears `loading`; a failed fetch never leaves
//!   the node stuck in `Loading`.
//! - Completions for nodes detached while loading are dropped.
//! - One `TreeEvent::Load` is emitted per completed attempt.

use super::TreeStore;
use crate::event::{LoadOutcome, TreeEvent};
use crate::model::config::LoadFailurePolicy;
use crate::model::node::{Children, NodeKey, NodeView};
use futures::future::LocalBoxFuture;
use log::{debug, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Future returned by a child loader.
pub type LoadFuture = LocalBoxFuture<'static, Result<Vec<Value>, LoadError>>;

/// Errors reported by child fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Transport or host-side failure.
    Fetch(String),
    /// Fetched payload could not be attached.
    InvalidData(String),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(message) => write!(f, "child fetch failed: {message}"),
            Self::InvalidData(message) => write!(f, "fetched children rejected: {message}"),
        }
    }
}

impl Error for LoadError {}

/// Host-supplied child fetch function.
pub trait ChildLoader {
    fn load(&self, node: &NodeView<'_>) -> LoadFuture;
}

impl<F> ChildLoader for F
where
    F: Fn(&NodeView<'_>) -> LoadFuture,
{
    fn load(&self, node: &NodeView<'_>) -> LoadFuture {
        self(node)
    }
}

/// A fetch started by the store and waiting to be driven by the host.
pub struct PendingLoad {
    key: NodeKey,
    fetch: LoadFuture,
}

impl PendingLoad {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    /// Awaits the fetch. Does not touch the store.
    pub async fn resolve(self) -> LoadCompletion {
        let result = self.fetch.await;
        LoadCompletion {
            key: self.key,
            result,
        }
    }
}

impl Debug for PendingLoad {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLoad")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Result of one fetch, handed back through `TreeStore::complete_load`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadCompletion {
    pub key: NodeKey,
    pub result: Result<Vec<Value>, LoadError>,
}

impl TreeStore {
    /// Starts fetching children of `key`.
    ///
    /// Returns `true` when a fetch was started. Nodes whose children are not
    /// `Unloaded`, nodes already loading, and stores without a loader are
    /// no-ops.
    pub fn load_children(&mut self, key: &NodeKey) -> bool {
        let Some(loader) = self.config.loader.clone() else {
            debug!("event=load_children module=loader status=skipped reason=no_loader key={key}");
            return false;
        };
        let Some(node) = self.nodes.get_mut(key) else {
            return false;
        };
        if !node.children.is_unloaded() || node.flags.loading {
            debug!(
                "event=load_children module=loader status=skipped reason=not_unloaded key={key}"
            );
            return false;
        }
        node.flags.loading = true;
        let fetch = loader.load(&node.view());
        self.pending_loads.push(PendingLoad {
            key: key.clone(),
            fetch,
        });
        info!("event=load_children module=loader status=start key={key}");
        self.update(key);
        true
    }

    pub fn has_pending_loads(&self) -> bool {
        !self.pending_loads.is_empty()
    }

    /// Hands every parked fetch to the caller.
    pub fn take_pending_loads(&mut self) -> Vec<PendingLoad> {
        std::mem::take(&mut self.pending_loads)
    }

    /// Applies a finished fetch to its node.
    ///
    /// Returns `None` when the node was detached while loading.
    pub fn complete_load(&mut self, completion: LoadCompletion) -> Option<LoadOutcome> {
        let LoadCompletion { key, result } = completion;
        let Some(node) = self.nodes.get_mut(&key) else {
            warn!("event=load_complete module=loader status=dropped reason=detached key={key}");
            return None;
        };
        node.flags.loading = false;

        let (data, outcome) = match result {
            Ok(data) if data.is_empty() => {
                if node.children.is_unloaded() {
                    node.children = Children::NoChildren;
                }
                (data, LoadOutcome::NoChildren)
            }
            Ok(data) => match self.append_data(Some(&key), data.clone()) {
                Ok(_) => (data, LoadOutcome::Loaded),
                Err(err) => {
                    self.apply_load_failure(&key, &LoadError::InvalidData(err.to_string()));
                    (data, LoadOutcome::Failed)
                }
            },
            Err(err) => {
                self.apply_load_failure(&key, &err);
                (Vec::new(), LoadOutcome::Failed)
            }
        };

        info!(
            "event=load_complete module=loader status=ok key={key} outcome={outcome:?} items={}",
            data.len()
        );
        self.emit(&TreeEvent::Load {
            key: key.clone(),
            data,
            outcome,
        });
        self.update_related(&key);
        self.refresh_view();
        Some(outcome)
    }

    /// Drives every parked fetch, including fetches started by completed
    /// ones, until none remain. Returns the number of completions applied.
    pub async fn run_pending_loads(&mut self) -> usize {
        let mut completed = 0;
        while self.has_pending_loads() {
            for pending in self.take_pending_loads() {
                let completion = pending.resolve().await;
                if self.complete_load(completion).is_some() {
                    completed += 1;
                }
            }
        }
        completed
    }

    fn apply_load_failure(&mut self, key: &NodeKey, err: &LoadError) {
        let policy = self.options().load_failure;
        warn!(
            "event=load_complete module=loader status=error key={key} policy={policy:?} error={err}"
        );
        if let Some(node) = self.nodes.get_mut(key) {
            if policy == LoadFailurePolicy::NoChildren && node.children.is_unloaded() {
                node.children = Children::NoChildren;
            }
        }
    }
}
