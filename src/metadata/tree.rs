//! Hierarchical parameter store.
//!
//! A [`MetaData`] node has a label, a description, a lock flag, an optional
//! [`MetaDataInfo`] payload and an ordered list of children. Children are owned
//! by value, so [`Clone`] performs a full deep copy of the subtree.
//!
//! Sibling labels are unique: [`MetaData::append_child`] and
//! [`MetaData::insert_child`] refuse a label that already exists and log an
//! error. Lookups are case-sensitive and linear in the number of siblings.

use super::info::{MetaDataFormat, MetaDataInfo};
use crate::error::{MocapError, Result};
use serde::{Deserialize, Serialize};

/// Label of the root node owned by an acquisition
pub const ROOT_LABEL: &str = "ROOT";

/// Node of the metadata tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    unlocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    info: Option<MetaDataInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<MetaData>,
}

impl MetaData {
    /// Unlocked node without payload
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: String::new(),
            unlocked: true,
            info: None,
            children: Vec::new(),
        }
    }

    /// Unlocked node carrying `info`
    pub fn with_info(label: impl Into<String>, info: MetaDataInfo) -> Self {
        Self {
            info: Some(info),
            ..Self::new(label)
        }
    }

    /// Builder-style description setter
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder-style lock setter
    pub fn locked(mut self, locked: bool) -> Self {
        self.unlocked = !locked;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn set_unlocked(&mut self, unlocked: bool) {
        self.unlocked = unlocked;
    }

    pub fn has_info(&self) -> bool {
        self.info.is_some()
    }

    pub fn info(&self) -> Option<&MetaDataInfo> {
        self.info.as_ref()
    }

    pub fn info_mut(&mut self) -> Option<&mut MetaDataInfo> {
        self.info.as_mut()
    }

    /// Replace the value payload
    pub fn set_info(&mut self, info: Option<MetaDataInfo>) {
        self.info = info;
    }

    // ── Children ──

    pub fn children(&self) -> std::slice::Iter<'_, MetaData> {
        self.children.iter()
    }

    pub fn children_mut(&mut self) -> std::slice::IterMut<'_, MetaData> {
        self.children.iter_mut()
    }

    pub fn child_number(&self) -> usize {
        self.children.len()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child(&self, idx: usize) -> Result<&MetaData> {
        let len = self.children.len();
        self.children
            .get(idx)
            .ok_or_else(|| MocapError::out_of_range(idx, len))
    }

    pub fn child_mut(&mut self, idx: usize) -> Result<&mut MetaData> {
        let len = self.children.len();
        self.children
            .get_mut(idx)
            .ok_or_else(|| MocapError::out_of_range(idx, len))
    }

    /// Child with the given label; a missing label is a domain error
    pub fn child_by_label(&self, label: &str) -> Result<&MetaData> {
        self.find_child(label)
            .ok_or_else(|| self.missing_child(label))
    }

    pub fn child_by_label_mut(&mut self, label: &str) -> Result<&mut MetaData> {
        let err = self.missing_child(label);
        self.find_child_mut(label).ok_or(err)
    }

    fn missing_child(&self, label: &str) -> MocapError {
        MocapError::Domain(format!(
            "no child labelled '{}' under '{}'",
            label, self.label
        ))
    }

    /// First child whose label matches exactly
    pub fn find_child(&self, label: &str) -> Option<&MetaData> {
        self.children.iter().find(|c| c.label == label)
    }

    pub fn find_child_mut(&mut self, label: &str) -> Option<&mut MetaData> {
        self.children.iter_mut().find(|c| c.label == label)
    }

    pub fn find_child_index(&self, label: &str) -> Option<usize> {
        self.children.iter().position(|c| c.label == label)
    }

    /// Append a child. Returns `false` (and logs) if the label already exists.
    pub fn append_child(&mut self, child: MetaData) -> bool {
        let end = self.children.len();
        self.insert_child(end, child)
    }

    /// Insert a child at `idx`. An index past the end appends.
    ///
    /// Returns `false` (and logs) if the label already exists.
    pub fn insert_child(&mut self, idx: usize, child: MetaData) -> bool {
        if self.find_child(&child.label).is_some() {
            tracing::error!(
                "Label '{}' already exists in the children of '{}'",
                child.label,
                self.label
            );
            return false;
        }
        let idx = if idx > self.children.len() {
            tracing::warn!("Insertion index {} out of range, the child is appended", idx);
            self.children.len()
        } else {
            idx
        };
        self.children.insert(idx, child);
        true
    }

    /// Child labelled `label`, appended as an empty unlocked node if absent
    pub fn get_or_append_child(&mut self, label: &str) -> &mut MetaData {
        let idx = match self.find_child_index(label) {
            Some(idx) => idx,
            None => {
                self.children.push(MetaData::new(label));
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    /// Replace the child carrying the same label, or append it
    pub fn replace_child(&mut self, child: MetaData) {
        match self.find_child_index(&child.label) {
            Some(idx) => self.children[idx] = child,
            None => self.children.push(child),
        }
    }

    /// Remove and return the child at `idx`
    pub fn take_child(&mut self, idx: usize) -> Result<MetaData> {
        if idx >= self.children.len() {
            return Err(MocapError::out_of_range(idx, self.children.len()));
        }
        Ok(self.children.remove(idx))
    }

    /// Remove and return the first child labelled `label`
    pub fn take_child_by_label(&mut self, label: &str) -> Option<MetaData> {
        self.find_child_index(label)
            .map(|idx| self.children.remove(idx))
    }

    /// Remove the first child labelled `label`; `false` if absent
    pub fn remove_child(&mut self, label: &str) -> bool {
        self.take_child_by_label(label).is_some()
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Payload of the child `label` when it matches the requested shape.
    ///
    /// The child must exist, carry a payload of `format` with exactly
    /// `num_dims` dimensions and, if `no_empty` is set, at least one value.
    pub fn extract_child_info(
        &self,
        label: &str,
        format: MetaDataFormat,
        num_dims: usize,
        no_empty: bool,
    ) -> Option<&MetaDataInfo> {
        let info = self.find_child(label)?.info()?;
        if info.format() != format || info.dimensions().len() != num_dims {
            return None;
        }
        if no_empty && info.is_empty() {
            return None;
        }
        Some(info)
    }

    /// Follow a `GROUP:PARAMETER` style path
    pub fn find_path(&self, path: &str) -> Option<&MetaData> {
        path.split(':')
            .try_fold(self, |node, label| node.find_child(label))
    }

    /// Depth-first visit of every descendant with its depth
    pub fn walk<F>(&self, mut f: F)
    where
        F: FnMut(usize, &MetaData),
    {
        fn visit<F: FnMut(usize, &MetaData)>(node: &MetaData, depth: usize, f: &mut F) {
            for child in &node.children {
                f(depth, child);
                visit(child, depth + 1, f);
            }
        }
        visit(self, 0, &mut f);
    }
}

impl Default for MetaData {
    fn default() -> Self {
        MetaData::new(ROOT_LABEL)
    }
}
