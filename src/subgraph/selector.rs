//! The membership protocol that drives subgraph extraction.

use crate::graph::{Attributes, Node, NodeId};

/// A read-only view of a node handed to a [`Selector`].
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'g> {
    id: NodeId,
    node: &'g Node,
}

impl<'g> NodeRef<'g> {
    pub(crate) fn new(id: NodeId, node: &'g Node) -> Self {
        Self { id, node }
    }

    pub fn id(&self) -> NodeId { self.id }
    pub fn op(&self) -> &'g str { &self.node.op }
    pub fn name(&self) -> &'g str { &self.node.name }
    pub fn attrs(&self) -> &'g Attributes { &self.node.attrs }
    pub fn node(&self) -> &'g Node { self.node }
}

/// Decides which nodes form one candidate subgraph.
///
/// The extractor calls [`reset`](Selector::reset) and then
/// [`select`](Selector::select) for every unclaimed node in topological order.
/// When a node is nominated as a seed, the candidate grows by asking
/// [`select_input`](Selector::select_input) about each direct producer and
/// [`select_output`](Selector::select_output) about each direct consumer of
/// every member until nothing more is admitted. [`filter`](Selector::filter)
/// then decides what part of the grown set is kept.
///
/// Implementations may keep state between calls for the same candidate, but
/// must not depend on anything other than their own state and the views they
/// are given.
pub trait Selector {
    /// Nominates `node` as the seed of a new candidate.
    fn select(&mut self, node: NodeRef<'_>) -> bool;

    /// Admits `producer`, a direct producer of the member `node`.
    fn select_input(&mut self, node: NodeRef<'_>, producer: NodeRef<'_>) -> bool;

    /// Admits `consumer`, a direct consumer of the member `node`.
    fn select_output(&mut self, node: NodeRef<'_>, consumer: NodeRef<'_>) -> bool;

    /// Returns the members to keep. An empty result rejects the candidate.
    /// Anything returned must be a member, at most once.
    fn filter(&mut self, candidates: &[NodeRef<'_>]) -> Vec<NodeId> {
        candidates.iter().map(NodeRef::id).collect()
    }

    /// Clears per-candidate state. Called before every seed.
    fn reset(&mut self) {}
}
