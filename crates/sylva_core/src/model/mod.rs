//! Tree domain model.
//!
//! # Responsibility
//! - Define node records, identities and view projections.
//! - Define tree configuration consumed by the store.
//!
//! # Invariants
//! - Every node is identified by a stable `NodeKey`.
//! - Model types hold no back-pointers; relations are keys resolved by the store.

pub mod config;
pub mod node;
