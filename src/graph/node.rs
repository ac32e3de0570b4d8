//! Defines the `Node` and its identifier, representing a single operator
//! invocation in the computation graph.

use super::dag::Graph;
use super::edge::{Use, ValueRef};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// A unique, stable identifier for a node within one graph.
///
/// Ids are arena indices and are never reused after a node is removed, so an id
/// held across a rewrite either still names the same node or names nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%n{}", self.0)
    }
}

/// Operator-specific parameters. Opaque to the engine.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// One operator invocation.
///
/// The adjacency fields are crate-private: edges are kept consistent on both
/// endpoints by the graph, never by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique within the owning graph (e.g. "relu", "relu_1").
    pub name: String,
    /// The operator-kind tag (e.g. "conv2d").
    pub op: String,
    /// Input slot `i` consumes `inputs[i]`. Order is significant.
    pub(crate) inputs: SmallVec<[ValueRef; 4]>,
    pub(crate) num_outputs: u32,
    /// Every consumer of any of this node's outputs, one entry per consuming slot.
    pub(crate) users: Vec<Use>,
    pub attrs: Attributes,
    /// Present only on Subgraph Nodes. Exclusively owned.
    pub(crate) subgraph: Option<Box<Graph>>,
}

impl Node {
    pub(crate) fn new(name: String, op: String, inputs: &[ValueRef], num_outputs: u32, attrs: Attributes) -> Self {
        Self {
            name,
            op,
            inputs: SmallVec::from_slice(inputs),
            num_outputs,
            users: Vec::new(),
            attrs,
            subgraph: None,
        }
    }

    pub fn inputs(&self) -> &[ValueRef] { &self.inputs }
    pub fn num_outputs(&self) -> u32 { self.num_outputs }
    pub fn users(&self) -> &[Use] { &self.users }
    pub fn subgraph(&self) -> Option<&Graph> { self.subgraph.as_deref() }
    pub fn is_subgraph(&self) -> bool { self.subgraph.is_some() }
}
