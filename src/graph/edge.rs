//! Defines the edge relation between a producing value and a consuming slot.
//!
//! Edges are not stored as objects. A node records the value each input slot
//! reads (`ValueRef`) and a producer records who reads it (`Use`); `Edge` is the
//! materialized pair handed out by queries.

use super::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The source of a value flowing along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueRef {
    /// A graph-level external input. No producer inside the graph.
    Input(u32),
    /// Output `slot` of `node`.
    Output { node: NodeId, slot: u32 },
}

impl ValueRef {
    pub fn output(node: NodeId, slot: u32) -> Self {
        ValueRef::Output { node, slot }
    }

    /// The producing node, if the value is not a graph input.
    pub fn node(&self) -> Option<NodeId> {
        match self {
            ValueRef::Input(_) => None,
            ValueRef::Output { node, .. } => Some(*node),
        }
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRef::Input(k) => write!(f, "%in{}", k),
            ValueRef::Output { node, slot } => write!(f, "{}:{}", node, slot),
        }
    }
}

/// A back-reference stored on the producer: `consumer.inputs[input_slot]`
/// reads this node's `output_slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Use {
    pub consumer: NodeId,
    pub input_slot: u32,
    pub output_slot: u32,
}

/// The consuming end of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Consumer {
    Node { node: NodeId, slot: u32 },
    /// Position in the graph's external output list.
    GraphOutput(u32),
}

/// A directed data dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub source: ValueRef,
    pub target: Consumer,
}
