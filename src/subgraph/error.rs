//! Defines the error types for subgraph extraction and surgery.
use super::property::FactoryError;
use crate::graph::{GraphError, NodeId};
use thiserror::Error;

/// Fatal to the whole pass. Raised before the graph is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Selector protocol violation for seed {seed}: {detail}")]
    SelectorProtocolViolation { seed: NodeId, detail: String },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Rejects one candidate. The graph is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurgeryError {
    #[error("Candidate set is empty")]
    EmptyCandidate,
    #[error("Node {0} appears more than once in the candidate set")]
    DuplicateMember(NodeId),
    #[error("Collapsing {members} node(s) into one would create a cycle")]
    CycleWouldForm { members: usize },
    #[error("Node factory failed: {0}")]
    FactoryFailure(#[from] FactoryError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}
