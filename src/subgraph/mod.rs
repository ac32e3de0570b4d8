//! Pattern matching and subgraph rewriting.
//!
//! A [`Property`] supplies a [`Selector`]; the [`Extractor`] drives it over the
//! graph to find disjoint candidate sets; the [`Surgeon`] collapses each one
//! into a Subgraph Node carrying the property's payload.

pub mod builtin;
pub mod error;
pub mod extractor;
pub mod property;
pub mod selector;
pub mod surgeon;

pub use error::{ExtractError, SurgeryError};
pub use extractor::{CandidateSet, Extraction, Extractor, RejectReason, RejectedCandidate};
pub use property::{FactoryError, Property, SUBGRAPH_OP};
pub use selector::{NodeRef, Selector};
pub use surgeon::{Boundary, Surgeon};
