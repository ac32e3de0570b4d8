//! Defines the error type for graph construction and traversal.
use super::node::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("Graph input %in{index} out of range (graph has {num_inputs} inputs)")]
    InputOutOfRange { index: u32, num_inputs: u32 },
    #[error("Output slot {slot} out of range for node {node} ({num_outputs} outputs)")]
    SlotOutOfRange { node: NodeId, slot: u32, num_outputs: u32 },
    #[error("Cycle detected involving node {node}")]
    CycleDetected { node: NodeId },
}
