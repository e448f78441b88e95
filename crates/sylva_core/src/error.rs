//! Tree operation errors.
//!
//! Guard rejections (cycle moves, same-position moves, toggles on
//! non-checkable nodes) are not errors; operators report them as no-ops.
//! `TreeError` covers inputs the store cannot act on at all.

use crate::model::node::NodeKey;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by tree store operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors from tree store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Referenced node is not attached to this store.
    NodeNotFound(NodeKey),
    /// Payload identity is already attached, or repeated inside one batch.
    DuplicateKey(NodeKey),
    /// Payload cannot be turned into a node.
    InvalidPayload(String),
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeNotFound(key) => write!(f, "tree node not found: {key}"),
            Self::DuplicateKey(key) => write!(f, "tree node key already attached: {key}"),
            Self::InvalidPayload(message) => write!(f, "invalid node payload: {message}"),
        }
    }
}

impl Error for TreeError {}
