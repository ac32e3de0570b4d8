use crate::graph::{Graph, GraphError, NodeId, ValueRef};
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashMap, HashSet, VecDeque};

/// Returns a topological sort using Kahn's Algorithm.
///
/// Ties are broken by creation order, so the result is deterministic for a
/// given graph.
pub fn sort(graph: &Graph) -> Result<Vec<NodeId>, GraphError> {
    let count = graph.node_count();
    let mut in_degree = vec![0usize; graph.nodes.capacity()];
    let mut queue = VecDeque::with_capacity(count);
    let mut order = Vec::with_capacity(count);

    // 1. Initialize In-Degrees O(N). One per node-sourced input slot.
    for (id, node) in graph.nodes() {
        let degree = node.inputs().iter().filter(|v| v.node().is_some()).count();
        in_degree[id.index()] = degree;
        if degree == 0 {
            queue.push_back(id);
        }
    }

    // 2. Process Queue. Each Use accounts for exactly one input slot.
    while let Some(id) = queue.pop_front() {
        order.push(id);
        let users = graph.node(id).map(|n| n.users()).unwrap_or_default();
        for u in users {
            // More uses than input slots means the adjacency is corrupt.
            let degree = in_degree
                .get_mut(u.consumer.index())
                .filter(|d| **d > 0)
                .ok_or(GraphError::CycleDetected { node: u.consumer })?;
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(u.consumer);
            }
        }
    }

    if order.len() != count {
        let stuck = graph
            .nodes()
            .map(|(id, _)| id)
            .find(|id| in_degree[id.index()] > 0)
            .unwrap_or_default();
        return Err(GraphError::CycleDetected { node: stuck });
    }

    Ok(order)
}

/// Identifies all nodes downstream from the given start nodes (inclusive).
pub fn downstream_from(graph: &Graph, start_nodes: &[NodeId]) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start_nodes.to_vec());

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            queue.extend(graph.consumers(node));
        }
    }
    visited
}

/// Identifies all nodes upstream from the given start nodes (inclusive).
pub fn upstream_from(graph: &Graph, start_nodes: &[NodeId]) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start_nodes.to_vec());

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            queue.extend(graph.producers(node));
        }
    }
    visited
}

/// Reports whether collapsing each group into a single vertex would leave a
/// cycle in the graph.
///
/// Groups must be disjoint. A group can close a cycle on its own (a path leaves
/// the group and re-enters it) or together with another group (A feeds B while
/// B feeds A), so all groups are contracted at once.
pub fn contraction_creates_cycle(graph: &Graph, groups: &[&[NodeId]]) -> bool {
    let base = graph.nodes.capacity() as u32;
    let mut representative: HashMap<NodeId, u32> = HashMap::new();
    for (i, group) in groups.iter().enumerate() {
        for &member in group.iter() {
            representative.insert(member, base + i as u32);
        }
    }
    let key = |id: NodeId| representative.get(&id).copied().unwrap_or(id.0);

    let mut quotient = DiGraphMap::<u32, ()>::new();
    for (id, node) in graph.nodes() {
        let to = key(id);
        quotient.add_node(to);
        for producer in node.inputs().iter().filter_map(ValueRef::node) {
            let from = key(producer);
            if from != to {
                quotient.add_edge(from, to, ());
            }
        }
    }
    is_cyclic_directed(&quotient)
}
