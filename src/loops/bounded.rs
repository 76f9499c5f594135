use std::collections::BTreeMap;
use std::time::Instant;

use log::debug;

use super::{attribute, LoopDetectionStrategy};
use crate::analysis::ReachabilityAnalysis;
use crate::fixpoint::{FixpointEngine, StateSets};
use crate::graph::NodeId;
use crate::ingress::IngressLocation;
use crate::observer::Phase;
use crate::reference::Ref;

/// Candidate sweep, confirmation and attribution.
#[derive(Debug, Default, Copy, Clone)]
pub struct BoundedRounds;

impl BoundedRounds {
    /// Everything that reaches each node within `rounds` steps of any ingress.
    pub fn candidates(engine: &FixpointEngine<'_>, rounds: usize) -> StateSets {
        let start = Instant::now();
        let bdd = engine.bdd();
        let seed: StateSets = engine
            .graph()
            .ingress_nodes()
            .values()
            .map(|&id| (id, bdd.one()))
            .collect();
        let candidates = engine.bounded_forward_sweep(&seed, rounds);
        engine
            .observer()
            .phase_finished(Phase::CandidateSearch, candidates.len(), start.elapsed());
        candidates
    }

    /// Whether some of `headers` at `node` come back to `node` still inside `headers`.
    pub fn confirm(engine: &FixpointEngine<'_>, node: NodeId, headers: Ref) -> bool {
        let bdd = engine.bdd();
        let returns = |reach: &StateSets| {
            reach
                .get(&node)
                .is_some_and(|&back| !bdd.is_zero(bdd.apply_and(back, headers)))
        };
        let reach = engine.forward_fixpoint_until(&StateSets::from([(node, headers)]), &returns);
        returns(&reach)
    }

    /// Confirmed loop states: for each node on a loop, the candidate headers that can return to it.
    pub fn loop_states(engine: &FixpointEngine<'_>, rounds: usize) -> StateSets {
        let candidates = Self::candidates(engine, rounds);
        let bdd = engine.bdd();

        let start = Instant::now();
        let mut loop_states = StateSets::new();
        for (&node, &headers) in &candidates {
            if engine.graph().predecessors(node).is_empty() {
                continue;
            }
            if !Self::confirm(engine, node, headers) {
                continue;
            }
            let recurrent = bdd.apply_and(headers, engine.recurrent_headers(node));
            if !bdd.is_zero(recurrent) {
                debug!("loop through {}", engine.graph().state(node));
                loop_states.insert(node, recurrent);
            }
        }
        engine
            .observer()
            .phase_finished(Phase::Confirmation, loop_states.len(), start.elapsed());
        loop_states
    }
}

impl LoopDetectionStrategy for BoundedRounds {
    fn name(&self) -> &'static str {
        "bounded-rounds"
    }

    fn detect(&self, analysis: &ReachabilityAnalysis) -> BTreeMap<IngressLocation, Ref> {
        let engine = analysis.engine();
        let loop_states = Self::loop_states(&engine, analysis.config().candidate_rounds());
        attribute(&engine, loop_states)
    }
}
