//! A rewriting rule: which nodes to group and what the fused node carries.

use super::selector::Selector;
use crate::graph::{Attributes, Graph};
use thiserror::Error;

/// Op tag given to Subgraph Nodes unless a property picks its own.
pub const SUBGRAPH_OP: &str = "_subgraph";

/// Reported by [`Property::create_node`] when it cannot build a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FactoryError {
    pub message: String,
}

impl FactoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Pairs a selector factory with a payload factory for the replacement nodes.
///
/// Properties are shared across worker threads; selectors are not, so each
/// pass gets its own from [`create_selector`](Property::create_selector).
pub trait Property: Send + Sync {
    fn name(&self) -> &str;

    /// A fresh selector for one extraction pass.
    fn create_selector(&self) -> Box<dyn Selector>;

    /// Builds the attribute payload of the node replacing `subgraph`.
    ///
    /// `ordinal` numbers the nodes this property creates within one pass. Use
    /// it for naming only.
    fn create_node(&self, subgraph: &Graph, ordinal: usize) -> Result<Attributes, FactoryError>;

    fn subgraph_op(&self) -> &str {
        SUBGRAPH_OP
    }
}
