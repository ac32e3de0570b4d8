//! Drives a `Selector` over a graph and yields disjoint candidate sets.

use super::error::ExtractError;
use super::selector::{NodeRef, Selector};
use crate::analysis::topology;
use crate::graph::{Graph, GraphError, NodeId};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// An accepted group of nodes, in topological order. Does not own the nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    seed: NodeId,
    members: Vec<NodeId>,
}

impl CandidateSet {
    pub fn seed(&self) -> NodeId { self.seed }
    pub fn members(&self) -> &[NodeId] { &self.members }
    pub fn len(&self) -> usize { self.members.len() }
    pub fn is_empty(&self) -> bool { self.members.is_empty() }
    pub fn contains(&self, id: NodeId) -> bool { self.members.contains(&id) }
    pub fn into_members(self) -> Vec<NodeId> { self.members }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    /// The selector's filter kept nothing.
    Filtered,
    /// Collapsing the candidate would close a cycle.
    CycleWouldForm,
    /// The property could not build the replacement node's payload.
    FactoryFailure(String),
    /// The surgeon refused the candidate for another reason.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedCandidate {
    pub seed: NodeId,
    pub members: Vec<NodeId>,
    pub reason: RejectReason,
}

/// The outcome of one extraction pass.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Accepted candidates in discovery order. Pairwise disjoint.
    pub candidates: Vec<CandidateSet>,
    pub rejected: Vec<RejectedCandidate>,
    /// How many nodes the selector nominated as seeds.
    pub seeds: usize,
}

pub struct Extractor<'g> {
    graph: &'g Graph,
}

impl<'g> Extractor<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    /// Runs `selector` over the whole graph.
    ///
    /// Seeds are visited in topological order. A node claimed by an accepted
    /// candidate is never offered again; nodes of a rejected candidate stay
    /// available as later seeds or members.
    pub fn extract(&self, selector: &mut dyn Selector) -> Result<Extraction, ExtractError> {
        let order = self.graph.topological_order()?;
        let position: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut consumed: HashSet<NodeId> = HashSet::new();
        let mut extraction = Extraction::default();

        for &seed in &order {
            if consumed.contains(&seed) {
                continue;
            }
            selector.reset();
            if !selector.select(self.view(seed)?) {
                continue;
            }
            extraction.seeds += 1;

            let members = self.expand(seed, &consumed, selector)?;
            let views = members.iter().map(|&id| self.view(id)).collect::<Result<Vec<_>, _>>()?;
            let mut kept = selector.filter(&views);
            check_filter_result(seed, &members, &kept)?;

            if kept.is_empty() {
                debug!(seed = %seed, grown = members.len(), "candidate filtered out");
                extraction.rejected.push(RejectedCandidate { seed, members, reason: RejectReason::Filtered });
                continue;
            }
            kept.sort_by_key(|id| position[id]);

            let mut groups: Vec<&[NodeId]> = extraction.candidates.iter().map(CandidateSet::members).collect();
            groups.push(&kept);
            if topology::contraction_creates_cycle(self.graph, &groups) {
                warn!(seed = %seed, members = kept.len(), "candidate would create a cycle, skipping");
                extraction.rejected.push(RejectedCandidate { seed, members: kept, reason: RejectReason::CycleWouldForm });
                continue;
            }

            debug!(seed = %seed, members = kept.len(), "candidate accepted");
            consumed.extend(kept.iter().copied());
            extraction.candidates.push(CandidateSet { seed, members: kept });
        }

        Ok(extraction)
    }

    /// Bidirectional worklist expansion to a fixpoint.
    ///
    /// All producers and then all consumers of a member are probed before the
    /// next member is taken from the frontier.
    fn expand(
        &self,
        seed: NodeId,
        consumed: &HashSet<NodeId>,
        selector: &mut dyn Selector,
    ) -> Result<Vec<NodeId>, ExtractError> {
        let mut members = vec![seed];
        let mut in_set = HashSet::from([seed]);
        let mut frontier = VecDeque::from([seed]);

        while let Some(current) = frontier.pop_front() {
            let here = self.view(current)?;

            for producer in self.graph.producers(current) {
                if in_set.contains(&producer) || consumed.contains(&producer) {
                    continue;
                }
                if selector.select_input(here, self.view(producer)?) {
                    in_set.insert(producer);
                    members.push(producer);
                    frontier.push_back(producer);
                }
            }

            for consumer in self.graph.consumers(current) {
                if in_set.contains(&consumer) || consumed.contains(&consumer) {
                    continue;
                }
                if selector.select_output(here, self.view(consumer)?) {
                    in_set.insert(consumer);
                    members.push(consumer);
                    frontier.push_back(consumer);
                }
            }
        }

        Ok(members)
    }

    fn view(&self, id: NodeId) -> Result<NodeRef<'g>, GraphError> {
        self.graph.node(id).map(|n| NodeRef::new(id, n)).ok_or(GraphError::UnknownNode(id))
    }
}

fn check_filter_result(seed: NodeId, members: &[NodeId], kept: &[NodeId]) -> Result<(), ExtractError> {
    let mut seen = HashSet::with_capacity(kept.len());
    for &id in kept {
        if !members.contains(&id) {
            return Err(ExtractError::SelectorProtocolViolation {
                seed,
                detail: format!("filter returned {} which was never admitted", id),
            });
        }
        if !seen.insert(id) {
            return Err(ExtractError::SelectorProtocolViolation {
                seed,
                detail: format!("filter returned {} more than once", id),
            });
        }
    }
    Ok(())
}
