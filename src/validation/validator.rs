//! The central validator that checks every structural invariant of a graph.
use super::error::{ValidationError, ValidationErrorType};
use crate::graph::{Graph, GraphError, NodeId, Use, ValueRef};
use std::collections::HashSet;

/// Checks a graph, and every graph nested inside it, for broken invariants.
///
/// Like a linter, it collects all problems instead of stopping at the first.
pub struct Validator<'a> {
    graph: &'a Graph,
}

impl<'a> Validator<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph }
    }

    /// # Returns
    /// - `Ok(())` if no invariant is broken.
    /// - `Err(Vec<ValidationError>)` containing every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        check_graph(self.graph, "", &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_graph(graph: &Graph, path: &str, errors: &mut Vec<ValidationError>) {
    let before = errors.len();
    let mut report = |node_id: Option<NodeId>, error_type: ValidationErrorType, message: String| {
        errors.push(ValidationError { node_id, error_type, message: format!("{}{}", path, message) });
    };

    let mut names = HashSet::new();
    for (id, node) in graph.nodes() {
        if !names.insert(node.name.as_str()) {
            report(Some(id), ValidationErrorType::DuplicateName, format!("Name '{}' is used by more than one node", node.name));
        }

        // Consumer side: every input must exist and be mirrored on its producer.
        for (slot, value) in node.inputs().iter().enumerate() {
            if let Err(e) = graph.check_value(value) {
                report(Some(id), ValidationErrorType::DanglingEdge, format!("Input {} of '{}': {}", slot, node.name, e));
                continue;
            }
            if let ValueRef::Output { node: producer, slot: output_slot } = *value {
                let mirrored = graph.node(producer).map_or(false, |p| {
                    p.users().contains(&Use { consumer: id, input_slot: slot as u32, output_slot })
                });
                if !mirrored {
                    report(
                        Some(id),
                        ValidationErrorType::AdjacencyMismatch,
                        format!("Input {} of '{}' reads {} but the producer does not list it", slot, node.name, value),
                    );
                }
            }
        }

        // Producer side: every use must point back at this node, once.
        let mut seen = HashSet::with_capacity(node.users().len());
        for u in node.users() {
            if !seen.insert(*u) {
                report(
                    Some(id),
                    ValidationErrorType::AdjacencyMismatch,
                    format!("'{}' lists user {} slot {} more than once", node.name, u.consumer, u.input_slot),
                );
                continue;
            }
            let expected = ValueRef::output(id, u.output_slot);
            let points_back = graph
                .node(u.consumer)
                .and_then(|c| c.inputs().get(u.input_slot as usize))
                .map_or(false, |v| *v == expected);
            if !points_back {
                report(
                    Some(id),
                    ValidationErrorType::AdjacencyMismatch,
                    format!("'{}' lists user {} slot {} which does not read {}", node.name, u.consumer, u.input_slot, expected),
                );
            }
        }

        if let Some(sub) = node.subgraph() {
            if sub.num_inputs() as usize != node.inputs().len() || sub.outputs().len() != node.num_outputs() as usize {
                report(
                    Some(id),
                    ValidationErrorType::SubgraphShape,
                    format!(
                        "Subgraph node '{}' has {} inputs / {} outputs but its graph has {} / {}",
                        node.name,
                        node.inputs().len(),
                        node.num_outputs(),
                        sub.num_inputs(),
                        sub.outputs().len()
                    ),
                );
            }
        }
    }

    for (i, value) in graph.outputs().iter().enumerate() {
        if let Err(e) = graph.check_value(value) {
            report(None, ValidationErrorType::DanglingEdge, format!("Graph output {}: {}", i, e));
        }
    }

    // A sort over broken adjacency reports nonsense, so only sort clean graphs.
    if errors.len() == before {
        if let Err(GraphError::CycleDetected { node }) = graph.topological_order() {
            errors.push(ValidationError {
                node_id: Some(node),
                error_type: ValidationErrorType::Cycle,
                message: format!("{}Cycle detected involving node {}", path, node),
            });
        }
    }

    for (_, node) in graph.nodes() {
        if let Some(sub) = node.subgraph() {
            check_graph(sub, &format!("{}in subgraph '{}': ", path, node.name), errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(node: NodeId) -> ValueRef { ValueRef::output(node, 0) }

    fn chain() -> (Graph, NodeId, NodeId) {
        let mut g = Graph::new();
        let x = g.add_input();
        let a = g.add_node("a", &[x], 1).unwrap();
        let b = g.add_node("b", &[out(a)], 1).unwrap();
        g.add_output(out(b)).unwrap();
        (g, a, b)
    }

    #[test]
    fn test_built_graph_is_valid() {
        let (g, _, _) = chain();
        assert_eq!(Validator::new(&g).validate(), Ok(()));
    }

    #[test]
    fn test_missing_back_reference_is_reported() {
        let (mut g, a, b) = chain();
        g.nodes.get_mut(a).unwrap().users.clear();

        let errors = Validator::new(&g).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ValidationErrorType::AdjacencyMismatch);
        assert_eq!(errors[0].node_id, Some(b));
    }

    #[test]
    fn test_dangling_input_is_reported() {
        let (mut g, a, b) = chain();
        g.nodes.remove(a);

        let errors = Validator::new(&g).validate().unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.error_type == ValidationErrorType::DanglingEdge && e.node_id == Some(b)));
    }

    #[test]
    fn test_cycle_is_reported() {
        let (mut g, a, b) = chain();
        g.nodes.get_mut(a).unwrap().inputs[0] = out(b);
        g.nodes.get_mut(b).unwrap().users.push(Use { consumer: a, input_slot: 0, output_slot: 0 });

        let errors = Validator::new(&g).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ValidationErrorType::Cycle);
    }

    #[test]
    fn test_duplicated_use_is_reported() {
        let (mut g, a, _) = chain();
        let extra = g.node(a).unwrap().users()[0];
        g.nodes.get_mut(a).unwrap().users.push(extra);

        let errors = Validator::new(&g).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ValidationErrorType::AdjacencyMismatch);
        assert_eq!(errors[0].node_id, Some(a));
    }

    #[test]
    fn test_duplicate_names_are_reported() {
        let (mut g, a, b) = chain();
        let taken = g.node(a).unwrap().name.clone();
        g.nodes.get_mut(b).unwrap().name = taken;

        let errors = Validator::new(&g).validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ValidationErrorType::DuplicateName);
        assert_eq!(errors[0].node_id, Some(b));
    }
}
