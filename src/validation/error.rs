//! Defines the error types for the validation module.
use crate::graph::NodeId;

/// The specific category of a validation error.
///
// This enum allows for programmatic inspection of errors, which is more
// robust than string matching on the error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorType {
    /// An edge endpoint names a node, input or output slot that does not exist.
    DanglingEdge,
    /// The producer's user list and the consumer's input list disagree.
    AdjacencyMismatch,
    /// The graph is not acyclic.
    Cycle,
    /// Two nodes in one graph share a name.
    DuplicateName,
    /// A Subgraph Node's arity differs from its nested graph's boundary.
    SubgraphShape,
}

/// A structured report of one broken graph invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The node where the problem was detected, if any. For nested graphs this
    /// is an id inside the nested graph.
    pub node_id: Option<NodeId>,
    pub error_type: ValidationErrorType,
    /// A human-readable message, prefixed with the path of enclosing Subgraph
    /// Nodes for nested graphs.
    pub message: String,
}
