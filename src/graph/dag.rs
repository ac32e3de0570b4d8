//! dag.rs
//! The computation graph: a node arena plus external inputs and outputs.
//!
//! The builder methods (`add_input`, `add_node`, `add_output`) are the ingestion
//! surface. Once built, the only mutation path is the crate-private splice API
//! used by the subgraph surgeon.

use super::edge::{Consumer, Edge, Use, ValueRef};
use super::error::GraphError;
use super::node::{Attributes, Node, NodeId};
use super::storage::NodeArena;
use crate::analysis::topology;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub(crate) nodes: NodeArena,
    num_inputs: u32,
    outputs: Vec<ValueRef>,
}

impl Graph {
    pub fn new() -> Self { Self::default() }

    pub fn with_inputs(num_inputs: u32) -> Self {
        Self { num_inputs, ..Self::default() }
    }

    // --- Builder ---

    pub fn add_input(&mut self) -> ValueRef {
        let v = ValueRef::Input(self.num_inputs);
        self.num_inputs += 1;
        v
    }

    /// Adds a node named after its op (made unique on collision).
    pub fn add_node(&mut self, op: &str, inputs: &[ValueRef], num_outputs: u32) -> Result<NodeId, GraphError> {
        self.add_named_node(op, op, inputs, num_outputs, Attributes::new())
    }

    pub fn add_named_node(
        &mut self,
        name: &str,
        op: &str,
        inputs: &[ValueRef],
        num_outputs: u32,
        attrs: Attributes,
    ) -> Result<NodeId, GraphError> {
        for v in inputs {
            self.check_value(v)?;
        }
        let node = Node::new(name.to_string(), op.to_string(), inputs, num_outputs, attrs);
        Ok(self.attach(node))
    }

    /// Marks a value as a graph-level output and returns its position.
    pub fn add_output(&mut self, value: ValueRef) -> Result<u32, GraphError> {
        self.check_value(&value)?;
        self.outputs.push(value);
        Ok((self.outputs.len() - 1) as u32)
    }

    // --- Accessors ---

    pub fn num_inputs(&self) -> u32 { self.num_inputs }
    pub fn outputs(&self) -> &[ValueRef] { &self.outputs }
    pub fn node_count(&self) -> usize { self.nodes.count() }
    pub fn node(&self, id: NodeId) -> Option<&Node> { self.nodes.get(id) }
    pub fn contains(&self, id: NodeId) -> bool { self.nodes.contains(id) }

    /// Live nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ { self.nodes.iter() }

    pub fn node_ids(&self) -> Vec<NodeId> { self.nodes.iter().map(|(id, _)| id).collect() }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|(_, n)| n.name == name).map(|(id, _)| id)
    }

    /// Distinct producer nodes of `id`, in input-slot order.
    pub fn producers(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = Vec::new();
        if let Some(node) = self.nodes.get(id) {
            for producer in node.inputs.iter().filter_map(ValueRef::node) {
                if !seen.contains(&producer) {
                    seen.push(producer);
                }
            }
        }
        seen
    }

    /// Distinct consumer nodes of `id`, in the order the edges were created.
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = Vec::new();
        if let Some(node) = self.nodes.get(id) {
            for u in &node.users {
                if !seen.contains(&u.consumer) {
                    seen.push(u.consumer);
                }
            }
        }
        seen
    }

    pub fn is_graph_output(&self, value: ValueRef) -> bool {
        self.outputs.contains(&value)
    }

    /// Every edge in the graph: node-to-node edges in consumer creation order,
    /// then graph outputs.
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::new();
        for (id, node) in self.nodes.iter() {
            for (slot, &source) in node.inputs.iter().enumerate() {
                edges.push(Edge { source, target: Consumer::Node { node: id, slot: slot as u32 } });
            }
        }
        for (i, &source) in self.outputs.iter().enumerate() {
            edges.push(Edge { source, target: Consumer::GraphOutput(i as u32) });
        }
        edges
    }

    // --- Graph Algorithms ---

    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        topology::sort(self)
    }

    pub fn downstream_from(&self, start_nodes: &[NodeId]) -> HashSet<NodeId> {
        topology::downstream_from(self, start_nodes)
    }

    pub fn upstream_from(&self, start_nodes: &[NodeId]) -> HashSet<NodeId> {
        topology::upstream_from(self, start_nodes)
    }

    /// Rebuilds name caches here and in every nested graph after deserialization.
    pub fn rebuild_name_caches(&mut self) {
        self.nodes.rebuild_name_cache();
        for (_, node) in self.nodes.iter_mut() {
            if let Some(sub) = node.subgraph.as_mut() {
                sub.rebuild_name_caches();
            }
        }
    }

    pub(crate) fn check_value(&self, value: &ValueRef) -> Result<(), GraphError> {
        match *value {
            ValueRef::Input(index) if index >= self.num_inputs => {
                Err(GraphError::InputOutOfRange { index, num_inputs: self.num_inputs })
            }
            ValueRef::Input(_) => Ok(()),
            ValueRef::Output { node, slot } => {
                let producer = self.nodes.get(node).ok_or(GraphError::UnknownNode(node))?;
                if slot >= producer.num_outputs {
                    return Err(GraphError::SlotOutOfRange { node, slot, num_outputs: producer.num_outputs });
                }
                Ok(())
            }
        }
    }

    // --- Splice API (surgeon only) ---
    // Callers guarantee every referenced value is live; these never fail.

    /// Inserts `node` and records its input edges on the producers.
    pub(crate) fn attach(&mut self, node: Node) -> NodeId {
        let inputs = node.inputs.clone();
        let id = self.nodes.push(node);
        for (slot, value) in inputs.iter().enumerate() {
            if let ValueRef::Output { node: producer, slot: output_slot } = *value {
                if let Some(p) = self.nodes.get_mut(producer) {
                    p.users.push(Use { consumer: id, input_slot: slot as u32, output_slot });
                }
            }
        }
        id
    }

    /// Re-points `consumer.inputs[input_slot]` at `value`, moving the edge on both ends.
    pub(crate) fn set_input(&mut self, consumer: NodeId, input_slot: u32, value: ValueRef) {
        let old = match self.nodes.get_mut(consumer) {
            Some(node) => std::mem::replace(&mut node.inputs[input_slot as usize], value),
            None => return,
        };
        if let Some(old_producer) = old.node().and_then(|p| self.nodes.get_mut(p)) {
            old_producer.users.retain(|u| !(u.consumer == consumer && u.input_slot == input_slot));
        }
        if let ValueRef::Output { node, slot } = value {
            if let Some(p) = self.nodes.get_mut(node) {
                p.users.push(Use { consumer, input_slot, output_slot: slot });
            }
        }
    }

    pub(crate) fn set_output(&mut self, index: usize, value: ValueRef) {
        self.outputs[index] = value;
    }

    /// Removes a node and its incoming edges. Outgoing edges must already have
    /// been redirected or belong to nodes that are detached too.
    pub(crate) fn detach(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(id)?;
        for producer in node.inputs.iter().filter_map(ValueRef::node) {
            if let Some(p) = self.nodes.get_mut(producer) {
                p.users.retain(|u| u.consumer != id);
            }
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_recorded_on_both_endpoints() {
        let mut g = Graph::new();
        let x = g.add_input();
        let a = g.add_node("a", &[x], 1).unwrap();
        let b = g.add_node("b", &[ValueRef::output(a, 0), ValueRef::output(a, 0)], 1).unwrap();

        let users = g.node(a).unwrap().users();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.consumer == b && u.output_slot == 0));
        assert_eq!(g.consumers(a), vec![b]);
        assert_eq!(g.producers(b), vec![a]);
    }

    #[test]
    fn test_builder_rejects_dangling_values() {
        let mut g = Graph::new();
        let a = g.add_node("a", &[], 1).unwrap();

        assert_eq!(
            g.add_node("b", &[ValueRef::Input(0)], 1),
            Err(GraphError::InputOutOfRange { index: 0, num_inputs: 0 })
        );
        assert_eq!(
            g.add_node("b", &[ValueRef::output(a, 1)], 1),
            Err(GraphError::SlotOutOfRange { node: a, slot: 1, num_outputs: 1 })
        );
        assert_eq!(
            g.add_output(ValueRef::output(NodeId(7), 0)),
            Err(GraphError::UnknownNode(NodeId(7)))
        );
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_set_input_moves_edge() {
        let mut g = Graph::new();
        let a = g.add_node("a", &[], 1).unwrap();
        let b = g.add_node("b", &[], 1).unwrap();
        let c = g.add_node("c", &[ValueRef::output(a, 0)], 1).unwrap();

        g.set_input(c, 0, ValueRef::output(b, 0));

        assert!(g.node(a).unwrap().users().is_empty());
        assert_eq!(g.node(b).unwrap().users(), &[Use { consumer: c, input_slot: 0, output_slot: 0 }]);
        assert_eq!(g.node(c).unwrap().inputs(), &[ValueRef::output(b, 0)]);
    }

    #[test]
    fn test_detach_clears_incoming_edges() {
        let mut g = Graph::new();
        let a = g.add_node("a", &[], 1).unwrap();
        let b = g.add_node("b", &[ValueRef::output(a, 0)], 1).unwrap();
        let c = g.add_node("c", &[ValueRef::output(a, 0)], 1).unwrap();

        g.detach(b).expect("b was live");

        assert!(!g.contains(b));
        assert_eq!(g.consumers(a), vec![c]);
        assert_eq!(g.node_ids(), vec![a, c]);
    }
}
