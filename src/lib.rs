//! Subgraph extraction and rewriting for dataflow graphs.
//!
//! A [`Property`] names a pattern (through its [`Selector`]) and the payload
//! of the node that replaces each match. [`optimize`] looks a property up in a
//! [`PropertyRegistry`], finds disjoint matches with the [`Extractor`] and
//! collapses each one into a Subgraph Node with the [`Surgeon`]. The absorbed
//! nodes live on inside the new node as a nested [`Graph`].

pub mod analysis;
pub mod display;
pub mod graph;
pub mod pass;
pub mod store;
pub mod subgraph;
pub mod validation;

pub use graph::{Attributes, Graph, GraphError, Node, NodeId, ValueRef};
pub use pass::{apply_property, optimize, optimize_all, PassError, PassReport};
pub use store::{ConfigError, PassConfig, PropertyRegistry, RegistryError};
pub use subgraph::{Extractor, Property, Selector, Surgeon};
pub use validation::{ValidationError, Validator};
