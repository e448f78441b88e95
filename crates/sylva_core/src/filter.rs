//! Ready-made filter predicates.
//!
//! # Responsibility
//! - Build common `NodeView` predicates for `TreeStore::set_filter` and
//!   `TreeConfig::with_filter`.
//!
//! # Invariants
//! - Blank needles match nothing, so an empty search box hides filter-only rows.
//! - Regex patterns are compiled once, when the predicate is built.

use crate::model::node::NodeView;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from building filter predicates.
#[derive(Debug, Clone)]
pub enum FilterError {
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPattern { pattern, source } => {
                write!(f, "invalid label pattern `{pattern}`: {source}")
            }
        }
    }
}

impl Error for FilterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPattern { source, .. } => Some(source),
        }
    }
}

/// Case-insensitive substring match on the node label.
pub fn label_contains(needle: &str) -> impl Fn(&NodeView<'_>) -> bool + 'static {
    let needle = needle.trim().to_lowercase();
    move |node: &NodeView<'_>| {
        !needle.is_empty() && node.label.to_lowercase().contains(needle.as_str())
    }
}

/// Regex match on the node label.
pub fn label_matches(
    pattern: &str,
) -> Result<impl Fn(&NodeView<'_>) -> bool + 'static, FilterError> {
    let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(move |node: &NodeView<'_>| regex.is_match(node.label))
}

/// Exact match on one top-level payload field.
pub fn payload_field_equals(
    field: impl Into<String>,
    expected: Value,
) -> impl Fn(&NodeView<'_>) -> bool + 'static {
    let field = field.into();
    move |node: &NodeView<'_>| node.payload.get(field.as_str()) == Some(&expected)
}

#[cfg(test)]
mod tests {
    use super::{label_contains, label_matches, payload_field_equals, FilterError};
    use crate::model::node::{LoaderState, NodeFlags, NodeKey, NodeView};
    use serde_json::json;

    fn view<'a>(key: &'a NodeKey, label: &'a str, payload: &'a serde_json::Value) -> NodeView<'a> {
        NodeView {
            key,
            label,
            payload,
            parent: None,
            flags: NodeFlags::default(),
            loader: LoaderState::NoChildren,
        }
    }

    #[test]
    fn label_contains_ignores_case_and_blank_needles() {
        let key = NodeKey::from("k");
        let payload = json!({});
        let node = view(&key, "Quarterly Report", &payload);

        assert!(label_contains("report")(&node));
        assert!(!label_contains("invoice")(&node));
        assert!(!label_contains("   ")(&node));
    }

    #[test]
    fn label_matches_compiles_pattern() {
        let key = NodeKey::from("k");
        let payload = json!({});
        let predicate = label_matches(r"^src/.*\.rs$").unwrap();

        assert!(predicate(&view(&key, "src/lib.rs", &payload)));
        assert!(!predicate(&view(&key, "docs/lib.md", &payload)));
    }

    #[test]
    fn label_matches_rejects_invalid_pattern() {
        let err = label_matches("(unclosed").err().unwrap();
        assert!(matches!(
            err,
            FilterError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"
        ));
        assert!(err.to_string().contains("invalid label pattern"));
    }

    #[test]
    fn payload_field_equals_reads_top_level_fields() {
        let key = NodeKey::from("k");
        let payload = json!({"kind": "folder"});
        let node = view(&key, "any", &payload);

        assert!(payload_field_equals("kind", json!("folder"))(&node));
        assert!(!payload_field_equals("kind", json!("file"))(&node));
        assert!(!payload_field_equals("missing", json!("folder"))(&node));
    }
}
