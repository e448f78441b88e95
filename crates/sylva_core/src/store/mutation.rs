//! Structural mutation operators.
//!
//! # Responsibility
//! - Build nodes from caller payload and link them under a parent.
//! - Move, insert relative to siblings, and remove nodes.
//! - Trigger propagation over exactly the touched closure.
//!
//! # Invariants
//! - Payload batches are validated before anything is linked; a rejected
//!   batch leaves the store untouched.
//! - A move never makes a node its own ancestor.
//! - Moving keeps expanded entries of the moved subtree and drops its
//!   checked and activated entries.
//! - Removal purges the whole subtree from the index and every state set.

use super::TreeStore;
use crate::error::{TreeError, TreeResult};
use crate::model::node::{Children, Node, NodeFlags, NodeKey, NodeOverrides, NodeUpdate};
use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One item handed to `append` / `insert`.
#[derive(Debug, Clone, PartialEq)]
pub enum Insertion {
    /// New node built from payload.
    Data(Value),
    /// Attached node to move.
    Existing(NodeKey),
}

impl From<Value> for Insertion {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl From<NodeKey> for Insertion {
    fn from(value: NodeKey) -> Self {
        Self::Existing(value)
    }
}

/// Payload nodes validated but not linked yet.
#[derive(Debug, Default)]
struct StagedNodes {
    tops: Vec<NodeKey>,
    nodes: Vec<Node>,
    seed_checked: Vec<NodeKey>,
    seed_expanded: Vec<NodeKey>,
    seed_actived: Vec<NodeKey>,
    unloaded: Vec<NodeKey>,
}

impl TreeStore {
    /// Appends items at the end of `parent`'s children (root list for `None`).
    ///
    /// Returns the keys that were attached or moved, in item order.
    pub fn append(
        &mut self,
        parent: Option<&NodeKey>,
        items: Vec<Insertion>,
    ) -> TreeResult<Vec<NodeKey>> {
        self.insert_items(parent, items, None)
    }

    /// Appends payload items under `parent`.
    pub fn append_data(
        &mut self,
        parent: Option<&NodeKey>,
        data: Vec<Value>,
    ) -> TreeResult<Vec<NodeKey>> {
        self.append(parent, data.into_iter().map(Insertion::Data).collect())
    }

    /// Inserts one item at `index` of `parent`'s children (append for `None`).
    ///
    /// Returns `None` when the item was an existing node and the move was
    /// refused by a guard.
    pub fn insert(
        &mut self,
        parent: Option<&NodeKey>,
        item: Insertion,
        index: Option<usize>,
    ) -> TreeResult<Option<NodeKey>> {
        Ok(self
            .insert_items(parent, vec![item], index)?
            .into_iter()
            .next())
    }

    /// Inserts `item` right before `anchor`, under the same parent.
    pub fn insert_before(
        &mut self,
        anchor: &NodeKey,
        item: Insertion,
    ) -> TreeResult<Option<NodeKey>> {
        let parent = self.require(anchor)?.parent.clone();
        let index = self.index_of(anchor);
        self.insert(parent.as_ref(), item, index)
    }

    /// Inserts `item` right after `anchor`, under the same parent.
    pub fn insert_after(
        &mut self,
        anchor: &NodeKey,
        item: Insertion,
    ) -> TreeResult<Option<NodeKey>> {
        let parent = self.require(anchor)?.parent.clone();
        let index = self.index_of(anchor).map(|index| index + 1);
        self.insert(parent.as_ref(), item, index)
    }

    /// Moves `key` under `new_parent` at `index` (append for `None`).
    ///
    /// Returns `Ok(false)` when the move would create a cycle or would not
    /// change the node position.
    pub fn move_node(
        &mut self,
        key: &NodeKey,
        new_parent: Option<&NodeKey>,
        index: Option<usize>,
    ) -> TreeResult<bool> {
        self.require(key)?;
        if let Some(parent) = new_parent {
            self.require(parent)?;
        }
        let moved = self.move_inner(key, new_parent, index);
        if moved {
            self.refresh_view();
        }
        Ok(moved)
    }

    /// Detaches `key` and its subtree.
    ///
    /// The detached nodes are returned with their last cached flags.
    pub fn remove(&mut self, key: &NodeKey) -> TreeResult<Vec<Node>> {
        let parent = self.require(key)?.parent.clone();
        let subtree = self.subtree_keys(key);
        self.child_list_mut(parent.as_ref())?
            .retain(|sibling| sibling != key);

        let mut detached = Vec::with_capacity(subtree.len());
        for descendant in &subtree {
            self.maps.purge(descendant);
            if let Some(node) = self.nodes.remove(descendant) {
                detached.push(node);
            }
        }
        let gone: HashSet<&NodeKey> = subtree.iter().collect();
        self.pending_loads
            .retain(|pending| !gone.contains(pending.key()));

        self.update_sibling_list(parent.as_ref());
        if let Some(parent) = parent.as_ref() {
            self.update(parent);
            self.update_parents(parent);
        }
        info!(
            "event=remove module=tree status=ok key={key} detached={}",
            detached.len()
        );
        self.refresh_view();
        Ok(detached)
    }

    /// Applies an explicit field update to one node.
    pub fn update_node(&mut self, key: &NodeKey, update: NodeUpdate) -> TreeResult<()> {
        self.require(key)?;
        if let Some(node) = self.nodes.get_mut(key) {
            if let Some(label) = update.label {
                node.label = label;
            }
            if let Some(value) = update.disabled {
                node.overrides.disabled = value;
            }
            if let Some(value) = update.checkable {
                node.overrides.checkable = value;
            }
            if let Some(value) = update.draggable {
                node.overrides.draggable = value;
            }
            if let Some(value) = update.expand_mutex {
                node.overrides.expand_mutex = value;
            }
            if let Some(value) = update.activable {
                node.overrides.activable = value;
            }
            if let Some(value) = update.loading {
                node.flags.loading = value;
            }
        }
        if let Some(checked) = update.checked {
            self.apply_checked(key, checked);
        }
        if let Some(expanded) = update.expanded {
            self.apply_expanded(key, expanded);
        }
        if let Some(actived) = update.actived {
            self.apply_activated(key, actived);
        }
        self.update(key);
        self.refresh_view();
        Ok(())
    }

    fn insert_items(
        &mut self,
        parent: Option<&NodeKey>,
        items: Vec<Insertion>,
        index: Option<usize>,
    ) -> TreeResult<Vec<NodeKey>> {
        if let Some(parent) = parent {
            self.require(parent)?;
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut payloads = Vec::new();
        for item in &items {
            match item {
                Insertion::Data(value) => payloads.push(value.clone()),
                Insertion::Existing(key) => {
                    self.require(key)?;
                }
            }
        }
        let staged = self.stage_payloads(parent, payloads)?;
        let StagedNodes {
            tops,
            nodes,
            seed_checked,
            seed_expanded,
            seed_actived,
            unloaded,
        } = staged;
        for node in nodes {
            self.nodes.insert(node.key.clone(), node);
        }

        let mut attached = Vec::with_capacity(items.len());
        let mut cursor = index;
        let mut tops = tops.into_iter();
        for item in items {
            match item {
                Insertion::Data(_) => {
                    let Some(top) = tops.next() else {
                        continue;
                    };
                    let list = self.child_list_mut(parent)?;
                    let at = cursor.unwrap_or(list.len()).min(list.len());
                    list.insert(at, top.clone());
                    cursor = cursor.map(|_| at + 1);
                    attached.push(top);
                }
                Insertion::Existing(key) => {
                    if self.move_inner(&key, parent, cursor) {
                        if cursor.is_some() {
                            cursor = self.index_of(&key).map(|position| position + 1);
                        }
                        attached.push(key);
                    }
                }
            }
        }

        let mut touched: Vec<NodeKey> = attached.clone();
        touched.extend(self.apply_seeds(seed_checked, seed_expanded, seed_actived));
        self.update_keys(&touched);
        self.update_sibling_list(parent);

        let lazy = self.options().lazy;
        for key in unloaded {
            if !lazy || self.maps.expanded.contains(&key) {
                self.load_children(&key);
            }
        }
        info!(
            "event=append module=tree status=ok parent={} attached={}",
            parent.map(NodeKey::as_str).unwrap_or("<root>"),
            attached.len()
        );
        self.refresh_view();
        Ok(attached)
    }

    /// Relinks an attached node. Returns `false` when a guard refused it.
    fn move_inner(
        &mut self,
        key: &NodeKey,
        new_parent: Option<&NodeKey>,
        index: Option<usize>,
    ) -> bool {
        if let Some(parent) = new_parent {
            if parent == key || self.parents(parent).contains(key) {
                debug!(
                    "event=move module=tree status=skipped reason=cycle key={key} parent={parent}"
                );
                return false;
            }
        }
        let Some(old_index) = self.index_of(key) else {
            return false;
        };
        let old_parent = self.parent(key).cloned();
        let same_parent = old_parent.as_ref() == new_parent;
        let target_len = self.child_list(new_parent).len();
        let mut target = index.unwrap_or(target_len).min(target_len);
        if same_parent {
            if target > old_index {
                target -= 1;
            }
            if target == old_index {
                debug!(
                    "event=move module=tree status=skipped reason=same_position key={key}"
                );
                return false;
            }
        }

        if let Ok(list) = self.child_list_mut(old_parent.as_ref()) {
            list.retain(|sibling| sibling != key);
        }
        match self.child_list_mut(new_parent) {
            Ok(list) => {
                let at = target.min(list.len());
                list.insert(at, key.clone());
            }
            Err(_) => return false,
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.parent = new_parent.cloned();
        }

        for descendant in self.subtree_keys(key) {
            self.maps.checked.remove(&descendant);
            self.maps.activated.remove(&descendant);
        }

        match new_parent {
            Some(parent) => self.update_related(parent),
            None => {
                self.update_children(key);
                self.update_sibling_list(None);
            }
        }
        if !same_parent {
            self.update_sibling_list(old_parent.as_ref());
            if let Some(old_parent) = old_parent.as_ref() {
                self.update(old_parent);
                self.update_parents(old_parent);
            }
        }
        info!(
            "event=move module=tree status=ok key={key} parent={}",
            new_parent.map(NodeKey::as_str).unwrap_or("<root>")
        );
        true
    }

    /// Commits payload-seeded states and returns the keys whose entries
    /// changed.
    fn apply_seeds(
        &mut self,
        checked: Vec<NodeKey>,
        expanded: Vec<NodeKey>,
        actived: Vec<NodeKey>,
    ) -> Vec<NodeKey> {
        let mut changed = Vec::new();
        for key in expanded {
            if self.seed_expanded(&key) {
                changed.push(key);
            }
        }
        for key in checked {
            if let Some(next) = self.next_checked_set(&key, true) {
                changed.extend(self.commit_checked_set(next));
            }
        }
        for key in actived {
            if let Some(next) = self.next_activated_set(&key, true) {
                changed.extend(self.maps.activated.changed_keys(&next));
                self.maps.activated = next;
            }
        }
        changed
    }

    fn stage_payloads(
        &self,
        parent: Option<&NodeKey>,
        values: Vec<Value>,
    ) -> TreeResult<StagedNodes> {
        let level = match parent {
            Some(parent) => self.parents(parent).len() + 1,
            None => 0,
        };
        let mut staged = StagedNodes::default();
        let mut seen = HashSet::new();
        for value in values {
            let key = self.stage_payload(value, parent.cloned(), level, &mut staged, &mut seen)?;
            staged.tops.push(key);
        }
        Ok(staged)
    }

    fn stage_payload(
        &self,
        value: Value,
        parent: Option<NodeKey>,
        level: usize,
        staged: &mut StagedNodes,
        seen: &mut HashSet<NodeKey>,
    ) -> TreeResult<NodeKey> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(TreeError::InvalidPayload(format!(
                    "expected an object, got `{other}`"
                )))
            }
        };
        let options = self.options();
        let key = fields
            .get(options.keys.value.as_str())
            .and_then(NodeKey::from_payload_value)
            .unwrap_or_else(NodeKey::generate);
        if self.nodes.contains_key(&key) || !seen.insert(key.clone()) {
            return Err(TreeError::DuplicateKey(key));
        }
        let label = match fields.get(options.keys.label.as_str()) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            _ => String::new(),
        };

        let children_value = fields.remove(options.keys.children.as_str());
        let may_have_children = matches!(
            children_value,
            Some(Value::Array(_)) | Some(Value::Bool(true))
        );
        // Seeds are recorded before the children so they stay in pre-order.
        let expand_by_policy =
            may_have_children && (options.expand_all || level < options.expand_level);
        if payload_flag(&fields, "expanded") || expand_by_policy {
            staged.seed_expanded.push(key.clone());
        }
        if payload_flag(&fields, "checked") {
            staged.seed_checked.push(key.clone());
        }
        if payload_flag(&fields, "actived") {
            staged.seed_actived.push(key.clone());
        }

        let children = match children_value {
            Some(Value::Array(items)) => {
                let mut child_keys = Vec::with_capacity(items.len());
                for item in items {
                    child_keys.push(self.stage_payload(
                        item,
                        Some(key.clone()),
                        level + 1,
                        staged,
                        seen,
                    )?);
                }
                Children::Loaded(child_keys)
            }
            Some(Value::Bool(true)) => Children::Unloaded,
            _ => Children::NoChildren,
        };
        if children.is_unloaded() {
            staged.unloaded.push(key.clone());
        }

        let overrides = NodeOverrides {
            expand_mutex: payload_flag(&fields, "expand_mutex"),
            activable: payload_flag(&fields, "activable"),
            checkable: payload_flag(&fields, "checkable"),
            disabled: payload_flag(&fields, "disabled"),
            draggable: payload_flag(&fields, "draggable"),
        };
        staged.nodes.push(Node {
            key: key.clone(),
            label,
            payload: Value::Object(fields),
            parent,
            children,
            overrides,
            flags: NodeFlags {
                level,
                ..NodeFlags::default()
            },
        });
        Ok(key)
    }
}

fn payload_flag(fields: &Map<String, Value>, name: &str) -> bool {
    fields.get(name).and_then(Value::as_bool).unwrap_or(false)
}
