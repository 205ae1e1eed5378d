//! The name index: an insertion-ordered multimap from result name to node.
//!
//! This is the set of columns a DAG currently exposes. Duplicate names are
//! legal and their relative order matters: merge and schema conversion
//! match duplicate-name streams by consuming occurrences in order.

use ceiba_core::id::NodeId;

#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: Vec<(String, NodeId)>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<(String, NodeId)>) -> Self {
        Self { entries }
    }

    pub fn insert(&mut self, name: String, id: NodeId) {
        self.entries.push((name, id));
    }

    pub fn prepend(&mut self, name: String, id: NodeId) {
        self.entries.insert(0, (name, id));
    }

    /// Remove every entry with this name, then append. Used when a name is
    /// intentionally re-bound.
    pub fn replace(&mut self, name: String, id: NodeId) {
        self.entries.retain(|(n, _)| *n != name);
        self.entries.push((name, id));
    }

    /// First entry for `name` in insertion order.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, id)| id)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn remove_at(&mut self, position: usize) -> (String, NodeId) {
        self.entries.remove(position)
    }

    pub fn retain(&mut self, keep: impl FnMut(&(String, NodeId)) -> bool) {
        self.entries.retain(keep);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, NodeId)> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|&(_, id)| id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
