//! All-pairs backward closure.
//!
//! `pre[i][k]` is the set of headers at node `i` that can reach node `k` over one or
//! more edges. The diagonal `pre[n][n]` is exactly the set of headers that can leave
//! `n` and come back, so it gives the loop states directly.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use log::debug;

use super::{attribute, LoopDetectionStrategy};
use crate::analysis::ReachabilityAnalysis;
use crate::fixpoint::{FixpointEngine, StateSets};
use crate::graph::NodeId;
use crate::ingress::IngressLocation;
use crate::observer::Phase;
use crate::reference::Ref;

/// Dense `n × n` matrix of header sets, row = source, column = target.
struct PairSets {
    n: usize,
    cells: Vec<Ref>,
}

impl PairSets {
    /// One-edge reachability: `pre[i][k]` is the domain of edge `i -> k`.
    fn from_edges(engine: &FixpointEngine<'_>) -> Self {
        let graph = engine.graph();
        let bdd = engine.bdd();
        let n = graph.node_count();
        let mut cells = vec![Ref::ZERO; n * n];
        for (_, edge) in graph.edges() {
            cells[edge.pre().index() * n + edge.post().index()] = edge.traverse_backward(bdd, bdd.one());
        }
        Self { n, cells }
    }

    fn get(&self, i: usize, k: usize) -> Ref {
        self.cells[i * self.n + k]
    }

    /// Union `headers` into `pre[i][k]`, returning whether it grew.
    fn extend(&mut self, engine: &FixpointEngine<'_>, i: usize, k: usize, headers: Ref) -> bool {
        let bdd = engine.bdd();
        if bdd.is_zero(headers) {
            return false;
        }
        let cell = &mut self.cells[i * self.n + k];
        let new = bdd.apply_or(*cell, headers);
        if new == *cell {
            false
        } else {
            *cell = new;
            true
        }
    }

    fn diagonal(&self, engine: &FixpointEngine<'_>) -> StateSets {
        (0..self.n)
            .map(|i| (NodeId::from_index(i), self.get(i, i)))
            .filter(|&(_, headers)| !engine.bdd().is_zero(headers))
            .collect()
    }
}

/// Round-based closure: every round relaxes every edge against every target.
#[derive(Debug, Default, Copy, Clone)]
pub struct AllPairsClosure;

impl AllPairsClosure {
    pub fn loop_states(engine: &FixpointEngine<'_>) -> StateSets {
        let start = Instant::now();
        let graph = engine.graph();
        let bdd = engine.bdd();
        let mut pre = PairSets::from_edges(engine);

        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut changed = 0;
            for (_, edge) in graph.edges() {
                let (i, j) = (edge.pre().index(), edge.post().index());
                for k in 0..pre.n {
                    let through = pre.get(j, k);
                    if bdd.is_zero(through) {
                        continue;
                    }
                    if pre.extend(engine, i, k, edge.traverse_backward(bdd, through)) {
                        changed += 1;
                    }
                }
            }
            engine.observer().round(Phase::Closure, rounds, changed);
            if changed == 0 {
                break;
            }
        }

        debug!("all-pairs closure converged after {} rounds", rounds);
        engine.observer().phase_finished(Phase::Closure, rounds, start.elapsed());
        pre.diagonal(engine)
    }
}

impl LoopDetectionStrategy for AllPairsClosure {
    fn name(&self) -> &'static str {
        "all-pairs-closure"
    }

    fn detect(&self, analysis: &ReachabilityAnalysis) -> BTreeMap<IngressLocation, Ref> {
        let engine = analysis.engine();
        attribute(&engine, Self::loop_states(&engine))
    }
}

/// Worklist-driven closure: only the in-edges of a row that just grew are relaxed.
#[derive(Debug, Default, Copy, Clone)]
pub struct DynamicRelaxation;

impl DynamicRelaxation {
    pub fn loop_states(engine: &FixpointEngine<'_>) -> StateSets {
        let start = Instant::now();
        let graph = engine.graph();
        let bdd = engine.bdd();
        let mut pre = PairSets::from_edges(engine);
        let n = pre.n;

        let mut queued = vec![false; n * n];
        let mut queue = VecDeque::new();
        for j in 0..n {
            for k in 0..n {
                if !bdd.is_zero(pre.get(j, k)) {
                    queued[j * n + k] = true;
                    queue.push_back((j, k));
                }
            }
        }

        let mut relaxations = 0;
        while let Some((j, k)) = queue.pop_front() {
            queued[j * n + k] = false;
            relaxations += 1;
            let through = pre.get(j, k);
            for &(i, e) in graph.predecessors(NodeId::from_index(j)) {
                let i = i.index();
                if pre.extend(engine, i, k, graph.edge(e).traverse_backward(bdd, through)) && !queued[i * n + k] {
                    queued[i * n + k] = true;
                    queue.push_back((i, k));
                }
            }
        }

        debug!("dynamic relaxation converged after {} relaxations", relaxations);
        engine
            .observer()
            .phase_finished(Phase::Closure, relaxations, start.elapsed());
        pre.diagonal(engine)
    }
}

impl LoopDetectionStrategy for DynamicRelaxation {
    fn name(&self) -> &'static str {
        "dynamic-relaxation"
    }

    fn detect(&self, analysis: &ReachabilityAnalysis) -> BTreeMap<IngressLocation, Ref> {
        let engine = analysis.engine();
        attribute(&engine, Self::loop_states(&engine))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bdd::Bdd;
    use crate::graph::{GraphBuilder, ReachabilityGraph};
    use crate::observer::NoopObserver;
    use crate::state::StateNode;
    use crate::transition::Transition;

    // A -> B -> C -> A, where B -> C needs x1 and C -> A sets x2.
    fn triangle(bdd: &Bdd) -> (ReachabilityGraph, [NodeId; 3]) {
        let mut builder = GraphBuilder::new();
        let a = builder.node(StateNode::post_in_vrf("r1", "default"));
        let b = builder.node(StateNode::post_in_vrf("r2", "default"));
        let c = builder.node(StateNode::post_in_vrf("r3", "default"));
        builder.edge(a, b, Transition::Identity).unwrap();
        builder.edge(b, c, Transition::constraint(bdd.mk_var(1))).unwrap();
        builder
            .edge(
                c,
                a,
                Transition::Assign {
                    vars: vec![2],
                    value: bdd.mk_var(2),
                },
            )
            .unwrap();
        (builder.build().unwrap(), [a, b, c])
    }

    #[test]
    fn test_closure_diagonal() {
        let bdd = Bdd::default();
        let (graph, [a, b, c]) = triangle(&bdd);
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);

        let x1 = bdd.mk_var(1);
        let expected = StateSets::from([(a, x1), (b, x1), (c, x1)]);
        assert_eq!(AllPairsClosure::loop_states(&engine), expected);
        assert_eq!(DynamicRelaxation::loop_states(&engine), expected);
    }

    #[test]
    fn test_closure_without_cycles() {
        let bdd = Bdd::default();
        let mut builder = GraphBuilder::new();
        let a = builder.node(StateNode::post_in_vrf("r1", "default"));
        let b = builder.node(StateNode::post_in_vrf("r2", "default"));
        let q = builder.query();
        builder.edge(a, b, Transition::Identity).unwrap();
        builder.edge(b, q, Transition::Identity).unwrap();
        let graph = builder.build().unwrap();
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);

        assert!(AllPairsClosure::loop_states(&engine).is_empty());
        assert!(DynamicRelaxation::loop_states(&engine).is_empty());
    }
}
