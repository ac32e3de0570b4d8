//! The orchestrator: look up a property, extract candidates, splice each one.

use crate::graph::{Graph, NodeId};
use crate::store::{PassConfig, PropertyRegistry, RegistryError};
use crate::subgraph::{ExtractError, Extractor, Property, RejectReason, RejectedCandidate, Surgeon, SurgeryError};
use crate::validation::{ValidationError, Validator};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Aborts the whole pass. The graph is left in its pre-pass state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    #[error(transparent)]
    Lookup(#[from] RegistryError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("Rewritten graph violates invariants ({} error(s)); changes rolled back", .0.len())]
    Verification(Vec<ValidationError>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub property: String,
    /// Nodes the selector nominated as seeds.
    pub seeds: usize,
    /// Subgraph Nodes inserted, in creation order.
    pub created: Vec<NodeId>,
    pub rejected: Vec<RejectedCandidate>,
}

impl From<&SurgeryError> for RejectReason {
    fn from(e: &SurgeryError) -> Self {
        match e {
            SurgeryError::CycleWouldForm { .. } => RejectReason::CycleWouldForm,
            SurgeryError::FactoryFailure(f) => RejectReason::FactoryFailure(f.message.clone()),
            other => RejectReason::Invalid(other.to_string()),
        }
    }
}

/// Looks up the configured property and applies it to `graph`.
///
/// An unknown property name fails before the graph is read.
pub fn optimize(graph: &mut Graph, registry: &PropertyRegistry, config: &PassConfig) -> Result<PassReport, PassError> {
    let property = registry.lookup(&config.property)?;
    let snapshot = config.verify.then(|| graph.clone());

    let report = apply_property(graph, property.as_ref())?;

    if let Some(snapshot) = snapshot {
        let verdict = Validator::new(graph).validate();
        if let Err(errors) = verdict {
            warn!(property = %config.property, errors = errors.len(), "rewritten graph failed verification");
            *graph = snapshot;
            return Err(PassError::Verification(errors));
        }
    }
    Ok(report)
}

/// Runs one extraction pass of `property` and splices every accepted candidate.
///
/// Candidates the surgeon refuses are recorded in the report and skipped.
pub fn apply_property(graph: &mut Graph, property: &dyn Property) -> Result<PassReport, PassError> {
    let mut selector = property.create_selector();
    let extraction = match Extractor::new(graph).extract(selector.as_mut()) {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(property = property.name(), error = %e, "extraction aborted");
            return Err(e.into());
        }
    };

    let mut report = PassReport {
        property: property.name().to_string(),
        seeds: extraction.seeds,
        created: Vec::with_capacity(extraction.candidates.len()),
        rejected: extraction.rejected,
    };

    let mut surgeon = Surgeon::new(graph);
    for (ordinal, candidate) in extraction.candidates.into_iter().enumerate() {
        match surgeon.extract(candidate.members(), property, ordinal) {
            Ok(id) => report.created.push(id),
            Err(e) => {
                warn!(property = property.name(), seed = %candidate.seed(), error = %e, "candidate rejected");
                report.rejected.push(RejectedCandidate {
                    seed: candidate.seed(),
                    reason: RejectReason::from(&e),
                    members: candidate.into_members(),
                });
            }
        }
    }

    info!(
        property = property.name(),
        seeds = report.seeds,
        created = report.created.len(),
        rejected = report.rejected.len(),
        "subgraph pass finished"
    );
    Ok(report)
}

/// Optimizes independent graphs in parallel. Each worker gets its own
/// property instance; results are in input order.
pub fn optimize_all(
    graphs: &mut [Graph],
    registry: &PropertyRegistry,
    config: &PassConfig,
) -> Vec<Result<PassReport, PassError>> {
    graphs.par_iter_mut().map(|graph| optimize(graph, registry, config)).collect()
}
