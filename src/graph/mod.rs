//! Defines the core data structures for the computation graph.
pub mod dag;
pub mod edge;
pub mod error;
pub mod io;
pub mod node;
pub mod storage;

// Re-export key types for convenient access
pub use dag::Graph;
pub use edge::{Consumer, Edge, Use, ValueRef};
pub use error::GraphError;
pub use node::{Attributes, Node, NodeId};
