//! Append-only node arena with stable identity.
//!
//! Slots are indexed by `NodeId`. Pushes never relocate and removal only
//! blanks a slot, so every id handed out stays valid until the node it
//! names is removed. Iteration skips blanked slots and follows insertion
//! order.

use ceiba_core::id::NodeId;

use crate::node::Node;

#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    slots: Vec<Option<Node>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_index(self.slots.len());
        self.slots.push(Some(node));
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.get(id.index()).is_some_and(Option::is_some)
    }

    pub fn get(&self, id: NodeId) -> &Node {
        self.slots[id.index()]
            .as_ref()
            .expect("node id refers to a removed slot")
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.index()]
            .as_mut()
            .expect("node id refers to a removed slot")
    }

    pub fn remove(&mut self, id: NodeId) {
        self.slots[id.index()] = None;
    }

    /// Live nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (NodeId::from_index(i), node)))
    }

    pub fn iter_rev(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .rev()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (NodeId::from_index(i), node)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut Node)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|node| (NodeId::from_index(i), node)))
    }

    /// Blank every slot the predicate rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId, &Node) -> bool) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let Some(node) = slot {
                if !keep(NodeId::from_index(i), node) {
                    *slot = None;
                }
            }
        }
    }

    /// Append another store's slots, preserving their order. Returns the
    /// offset by which the other store's ids must be rebased.
    pub fn splice(&mut self, other: NodeStore) -> usize {
        let base = self.slots.len();
        self.slots.extend(other.slots);
        base
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}
