//! Forwarding-loop detection.
//!
//! The loop predicate of an ingress location is the set of headers that, injected
//! there, can follow a walk revisiting some state node. The model carries no TTL, so
//! when every edge on the cycle only filters, a packet that comes back to a state can
//! keep circling. Rewriting edges weaken this: a header may revisit a node once, come
//! back rewritten, and then leave the cycle. It is still reported.
//!
//! Several strategies compute the same predicate:
//!
//! - [`BoundedRounds`] (default): bounded forward sweep for candidates, per-node
//!   confirmation, backward attribution of the recurrent part.
//! - [`AllPairsClosure`] and [`DynamicRelaxation`]: all-pairs backward closure of
//!   "headers at `i` that can reach `k`", round-based or worklist-driven.
//! - [`PathHistoryDfs`]: explicit-stack depth-first search collecting lassos.
//! - [`PathEnumeration`]: the cached [`PathDb`] of all simple paths.
//!
//! All strategies agree whenever every transition is exact and the candidate
//! round bound covers the graph.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Instant;

use crate::analysis::ReachabilityAnalysis;
use crate::fixpoint::{FixpointEngine, StateSets};
use crate::ingress::IngressLocation;
use crate::observer::Phase;
use crate::reference::Ref;

pub mod bounded;
pub mod closure;
pub mod dfs;
pub mod paths;

pub use bounded::BoundedRounds;
pub use closure::{AllPairsClosure, DynamicRelaxation};
pub use dfs::{LoopWitness, PathHistoryDfs};
pub use paths::{PathDb, PathEnumeration, PathRecord};

pub trait LoopDetectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Loop predicate for every ingress location of the analysed graph.
    fn detect(&self, analysis: &ReachabilityAnalysis) -> BTreeMap<IngressLocation, Ref>;
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LoopStrategy {
    #[default]
    BoundedRounds,
    AllPairsClosure,
    DynamicRelaxation,
    PathHistoryDfs,
    PathEnumeration,
}

impl LoopStrategy {
    pub const ALL: [LoopStrategy; 5] = [
        LoopStrategy::BoundedRounds,
        LoopStrategy::AllPairsClosure,
        LoopStrategy::DynamicRelaxation,
        LoopStrategy::PathHistoryDfs,
        LoopStrategy::PathEnumeration,
    ];

    pub fn detector(self) -> &'static dyn LoopDetectionStrategy {
        match self {
            LoopStrategy::BoundedRounds => &BoundedRounds,
            LoopStrategy::AllPairsClosure => &AllPairsClosure,
            LoopStrategy::DynamicRelaxation => &DynamicRelaxation,
            LoopStrategy::PathHistoryDfs => &PathHistoryDfs,
            LoopStrategy::PathEnumeration => &PathEnumeration,
        }
    }
}

impl Display for LoopStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.detector().name())
    }
}

/// Pull per-node loop states back to the ingress locations that can reach them.
pub(crate) fn attribute(engine: &FixpointEngine<'_>, mut loop_states: StateSets) -> BTreeMap<IngressLocation, Ref> {
    let start = Instant::now();
    let seeds = loop_states.len();
    engine.backward_fixpoint(&mut loop_states);
    let result = engine.project_ingress(&loop_states);
    engine
        .observer()
        .phase_finished(Phase::Attribution, seeds, start.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names_are_distinct() {
        let mut names: Vec<String> = LoopStrategy::ALL.iter().map(|s| s.to_string()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), LoopStrategy::ALL.len());
        assert_eq!(LoopStrategy::default(), LoopStrategy::BoundedRounds);
    }
}
