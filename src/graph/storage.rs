//! storage.rs
//! Slot arena for nodes. Removal leaves a tombstone so ids stay stable.

use super::node::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeArena {
    slots: Vec<Option<Node>>,
    live: usize,

    // Ephemeral state for uniqueness checks (Not serialized, rebuilt on load)
    #[serde(skip)]
    used_names: HashSet<String>,
}

// The name cache is derived state and is left out of comparisons.
impl PartialEq for NodeArena {
    fn eq(&self, other: &Self) -> bool {
        self.live == other.live && self.slots == other.slots
    }
}

impl NodeArena {
    pub fn new() -> Self { Self::default() }

    /// Number of live nodes.
    pub fn count(&self) -> usize { self.live }

    /// One past the largest id ever handed out.
    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Rebuilds the `used_names` set after deserialization.
    pub fn rebuild_name_cache(&mut self) {
        self.used_names = self.iter().map(|(_, n)| n.name.clone()).collect();
    }

    /// Returns `base` if free, otherwise the first free `base_1`, `base_2`, ...
    pub fn unique_name(&self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut counter = 1;
        while self.used_names.contains(&candidate) {
            candidate = format!("{}_{}", base, counter);
            counter += 1;
        }
        candidate
    }

    pub fn push(&mut self, mut node: Node) -> NodeId {
        let id = NodeId::new(self.slots.len());
        node.name = self.unique_name(&node.name);
        self.used_names.insert(node.name.clone());
        self.slots.push(Some(node));
        self.live += 1;
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.slots.get_mut(id.index())?.take()?;
        self.used_names.remove(&node.name);
        self.live -= 1;
        Some(node)
    }

    #[inline(always)]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index())?.as_ref()
    }

    #[inline(always)]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool { self.get(id).is_some() }

    /// Live nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (NodeId::new(i), n)))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut Node)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|n| (NodeId::new(i), n)))
    }
}
