//! Collapses an accepted candidate set into one Subgraph Node.
//!
//! All fallible work (validation, cycle check, boundary, nested graph, payload)
//! happens before the first write, so a failed extraction leaves the graph
//! untouched.

use super::error::SurgeryError;
use super::property::Property;
use crate::analysis::topology;
use crate::graph::{Graph, GraphError, Node, NodeId, ValueRef};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// The values crossing into and out of a candidate set.
///
/// Positions in `inputs` and `outputs` are the input and output slots of the
/// Subgraph Node and of its nested graph. Crossing edges are counted per value:
/// two member slots reading the same outside value share one input, and an
/// output read by several outside consumers is a single output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    /// Distinct outside values read by members, in first-use order.
    pub inputs: Vec<ValueRef>,
    /// Distinct member values read outside the set or returned by the graph.
    pub outputs: Vec<ValueRef>,
}

impl Boundary {
    /// `ordered` must be the members in topological order.
    pub fn compute(graph: &Graph, ordered: &[NodeId], in_set: &HashSet<NodeId>) -> Self {
        let mut inputs = Vec::new();
        let mut seen = HashSet::new();
        let mut outputs = Vec::new();

        for node in ordered.iter().filter_map(|&id| graph.node(id)) {
            for &value in node.inputs() {
                let internal = value.node().map_or(false, |p| in_set.contains(&p));
                if !internal && seen.insert(value) {
                    inputs.push(value);
                }
            }
        }

        for &id in ordered {
            let Some(node) = graph.node(id) else { continue };
            for slot in 0..node.num_outputs() {
                let value = ValueRef::output(id, slot);
                let escapes = node
                    .users()
                    .iter()
                    .any(|u| u.output_slot == slot && !in_set.contains(&u.consumer))
                    || graph.is_graph_output(value);
                if escapes {
                    outputs.push(value);
                }
            }
        }

        Self { inputs, outputs }
    }
}

pub struct Surgeon<'g> {
    graph: &'g mut Graph,
}

impl<'g> Surgeon<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Self { graph }
    }

    /// Replaces `members` with a single node built by `property`.
    ///
    /// Returns the id of the new node.
    pub fn extract(
        &mut self,
        members: &[NodeId],
        property: &dyn Property,
        ordinal: usize,
    ) -> Result<NodeId, SurgeryError> {
        if members.is_empty() {
            return Err(SurgeryError::EmptyCandidate);
        }
        let mut in_set = HashSet::with_capacity(members.len());
        for &id in members {
            if !self.graph.contains(id) {
                return Err(GraphError::UnknownNode(id).into());
            }
            if !in_set.insert(id) {
                return Err(SurgeryError::DuplicateMember(id));
            }
        }

        if topology::contraction_creates_cycle(self.graph, &[members]) {
            return Err(SurgeryError::CycleWouldForm { members: members.len() });
        }

        let ordered: Vec<NodeId> = self
            .graph
            .topological_order()?
            .into_iter()
            .filter(|id| in_set.contains(id))
            .collect();
        let boundary = Boundary::compute(self.graph, &ordered, &in_set);
        let subgraph = self.build_subgraph(&ordered, &in_set, &boundary)?;

        let attrs = property.create_node(&subgraph, ordinal)?;

        // --- No failure past this point ---
        let mut node = Node::new(
            format!("{}_subgraph{}", property.name(), ordinal),
            property.subgraph_op().to_string(),
            &boundary.inputs,
            boundary.outputs.len() as u32,
            attrs,
        );
        node.subgraph = Some(Box::new(subgraph));
        let new_id = self.splice(node, &ordered, &in_set, &boundary);

        debug!(
            property = property.name(),
            node = %new_id,
            absorbed = ordered.len(),
            inputs = boundary.inputs.len(),
            outputs = boundary.outputs.len(),
            "spliced subgraph node"
        );
        Ok(new_id)
    }

    /// Copies the members into a fresh graph whose inputs and outputs are the
    /// boundary slots.
    fn build_subgraph(
        &self,
        ordered: &[NodeId],
        in_set: &HashSet<NodeId>,
        boundary: &Boundary,
    ) -> Result<Graph, SurgeryError> {
        let input_slot: HashMap<ValueRef, u32> =
            boundary.inputs.iter().enumerate().map(|(i, &v)| (v, i as u32)).collect();
        let mut sub = Graph::with_inputs(boundary.inputs.len() as u32);
        let mut remap: HashMap<NodeId, NodeId> = HashMap::with_capacity(ordered.len());

        for &id in ordered {
            let node = self.graph.node(id).ok_or(GraphError::UnknownNode(id))?;
            let mut copy = node.clone();
            copy.users.clear();
            for value in copy.inputs.iter_mut() {
                *value = match *value {
                    ValueRef::Output { node: producer, slot } if in_set.contains(&producer) => {
                        // Topological order guarantees the producer was copied first.
                        let mapped = remap.get(&producer).expect("BUG: member producer not yet copied");
                        ValueRef::output(*mapped, slot)
                    }
                    outside => ValueRef::Input(*input_slot.get(&outside).expect("BUG: boundary input missing")),
                };
            }
            remap.insert(id, sub.attach(copy));
        }

        for value in &boundary.outputs {
            if let ValueRef::Output { node, slot } = *value {
                let mapped = remap.get(&node).expect("BUG: boundary output from a non-member");
                sub.add_output(ValueRef::output(*mapped, slot))?;
            }
        }
        Ok(sub)
    }

    /// Inserts the replacement node and moves every boundary edge onto it.
    fn splice(&mut self, node: Node, ordered: &[NodeId], in_set: &HashSet<NodeId>, boundary: &Boundary) -> NodeId {
        let new_id = self.graph.attach(node);

        // 1. Redirect outside readers, keeping their slot positions and fan-out.
        for (j, &value) in boundary.outputs.iter().enumerate() {
            let ValueRef::Output { node: member, slot } = value else { continue };
            let replacement = ValueRef::output(new_id, j as u32);

            let readers: Vec<(NodeId, u32)> = self
                .graph
                .node(member)
                .map(|n| {
                    n.users()
                        .iter()
                        .filter(|u| u.output_slot == slot && !in_set.contains(&u.consumer))
                        .map(|u| (u.consumer, u.input_slot))
                        .collect()
                })
                .unwrap_or_default();
            for (consumer, input_slot) in readers {
                self.graph.set_input(consumer, input_slot, replacement);
            }

            for i in 0..self.graph.outputs().len() {
                if self.graph.outputs()[i] == value {
                    self.graph.set_output(i, replacement);
                }
            }
        }

        // 2. Drop the absorbed nodes and their incoming edges.
        for &id in ordered {
            self.graph.detach(id);
        }
        new_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Attributes, Use};
    use crate::subgraph::builtin::{summarize, OpSetSelector};
    use crate::subgraph::property::FactoryError;
    use crate::subgraph::selector::Selector;
    use crate::validation::Validator;

    fn out(node: NodeId) -> ValueRef { ValueRef::output(node, 0) }

    struct Fuse {
        fail: bool,
    }

    impl Property for Fuse {
        fn name(&self) -> &str { "fuse" }
        fn create_selector(&self) -> Box<dyn Selector> { Box::new(OpSetSelector::new(["f"], 1)) }
        fn create_node(&self, subgraph: &Graph, _ordinal: usize) -> Result<Attributes, FactoryError> {
            if self.fail {
                return Err(FactoryError::new("backend refused"));
            }
            summarize(subgraph)
        }
    }

    /// x0, x1 -> a; a -> b; x1 -> b; b -> c, b -> d; d is a graph output.
    fn fixture() -> (Graph, [NodeId; 4]) {
        let mut g = Graph::new();
        let x0 = g.add_input();
        let x1 = g.add_input();
        let a = g.add_node("a", &[x0, x1], 1).unwrap();
        let b = g.add_node("b", &[out(a), x1], 2).unwrap();
        let c = g.add_node("c", &[ValueRef::output(b, 1)], 1).unwrap();
        let d = g.add_node("d", &[out(b), ValueRef::output(b, 1)], 1).unwrap();
        g.add_output(out(d)).unwrap();
        (g, [a, b, c, d])
    }

    #[test]
    fn test_boundary_dedupes_values_and_keeps_order() {
        let (g, [a, b, _, _]) = fixture();
        let in_set = HashSet::from([a, b]);
        let boundary = Boundary::compute(&g, &[a, b], &in_set);

        assert_eq!(boundary.inputs, vec![ValueRef::Input(0), ValueRef::Input(1)]);
        assert_eq!(boundary.outputs, vec![ValueRef::output(b, 0), ValueRef::output(b, 1)]);
    }

    #[test]
    fn test_extract_rewires_boundary() {
        let (mut g, [a, b, c, d]) = fixture();
        let new_id = Surgeon::new(&mut g).extract(&[a, b], &Fuse { fail: false }, 0).unwrap();

        assert!(!g.contains(a) && !g.contains(b));
        let node = g.node(new_id).unwrap();
        assert_eq!(node.op, "_subgraph");
        assert_eq!(node.name, "fuse_subgraph0");
        assert_eq!(node.inputs(), &[ValueRef::Input(0), ValueRef::Input(1)]);
        assert_eq!(node.num_outputs(), 2);

        // b:1 fanned out to c and d; b:0 went to d slot 0.
        assert_eq!(g.node(c).unwrap().inputs(), &[ValueRef::output(new_id, 1)]);
        assert_eq!(g.node(d).unwrap().inputs(), &[ValueRef::output(new_id, 0), ValueRef::output(new_id, 1)]);
        assert_eq!(
            node.users(),
            &[
                Use { consumer: d, input_slot: 0, output_slot: 0 },
                Use { consumer: c, input_slot: 0, output_slot: 1 },
                Use { consumer: d, input_slot: 1, output_slot: 1 },
            ]
        );

        let sub = node.subgraph().unwrap();
        assert_eq!(sub.num_inputs(), 2);
        assert_eq!(sub.node_count(), 2);
        let sa = sub.find("a").unwrap();
        let sb = sub.find("b").unwrap();
        assert_eq!(sub.node(sb).unwrap().inputs(), &[out(sa), ValueRef::Input(1)]);
        assert_eq!(sub.outputs(), &[ValueRef::output(sb, 0), ValueRef::output(sb, 1)]);

        assert_eq!(Validator::new(&g).validate(), Ok(()));
    }

    #[test]
    fn test_graph_output_member_is_redirected() {
        let (mut g, [_, _, c, d]) = fixture();
        let new_id = Surgeon::new(&mut g).extract(&[c, d], &Fuse { fail: false }, 3).unwrap();

        // c has no outside readers, so only d's value crosses out.
        assert_eq!(g.outputs(), &[ValueRef::output(new_id, 0)]);
        assert_eq!(g.node(new_id).unwrap().num_outputs(), 1);
        assert_eq!(g.node(new_id).unwrap().name, "fuse_subgraph3");
        assert_eq!(Validator::new(&g).validate(), Ok(()));
    }

    #[test]
    fn test_factory_failure_leaves_graph_untouched() {
        let (mut g, [a, b, _, _]) = fixture();
        let before = g.clone();

        let err = Surgeon::new(&mut g).extract(&[a, b], &Fuse { fail: true }, 0).unwrap_err();

        assert_eq!(err, SurgeryError::FactoryFailure(FactoryError::new("backend refused")));
        assert_eq!(g, before);
    }

    #[test]
    fn test_cycle_is_refused_before_any_change() {
        // a -> x -> b and a -> b; collapsing {a, b} would loop through x.
        let mut g = Graph::new();
        let a = g.add_node("a", &[], 1).unwrap();
        let x = g.add_node("x", &[out(a)], 1).unwrap();
        let b = g.add_node("b", &[out(x), out(a)], 1).unwrap();
        let before = g.clone();

        let err = Surgeon::new(&mut g).extract(&[a, b], &Fuse { fail: false }, 0).unwrap_err();

        assert_eq!(err, SurgeryError::CycleWouldForm { members: 2 });
        assert_eq!(g, before);
    }

    #[test]
    fn test_invalid_candidates_are_refused() {
        let (mut g, [a, _, _, _]) = fixture();
        let prop = Fuse { fail: false };
        let mut surgeon = Surgeon::new(&mut g);

        assert_eq!(surgeon.extract(&[], &prop, 0), Err(SurgeryError::EmptyCandidate));
        assert_eq!(surgeon.extract(&[a, a], &prop, 0), Err(SurgeryError::DuplicateMember(a)));
        assert_eq!(
            surgeon.extract(&[NodeId(99)], &prop, 0),
            Err(SurgeryError::Graph(GraphError::UnknownNode(NodeId(99))))
        );
    }
}
