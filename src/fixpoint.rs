//! Least-fixpoint propagation of header sets along the reachability graph.
//!
//! Every computation here accumulates predicates monotonically (union only) over
//! a finite graph and a finite header space, so it terminates. Convergence is
//! detected by handle equality, which is semantic equality in a canonical BDD.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use log::debug;

use crate::bdd::Bdd;
use crate::graph::{NodeId, ReachabilityGraph};
use crate::ingress::IngressLocation;
use crate::observer::{AnalysisObserver, Phase};
use crate::reference::Ref;

/// Header sets per node. Absent nodes hold the empty set.
pub type StateSets = BTreeMap<NodeId, Ref>;

/// Fixpoint primitives over one graph, reporting to one observer.
#[derive(Copy, Clone)]
pub struct FixpointEngine<'a> {
    bdd: &'a Bdd,
    graph: &'a ReachabilityGraph,
    observer: &'a dyn AnalysisObserver,
}

impl<'a> FixpointEngine<'a> {
    pub fn new(bdd: &'a Bdd, graph: &'a ReachabilityGraph, observer: &'a dyn AnalysisObserver) -> Self {
        Self { bdd, graph, observer }
    }

    pub fn bdd(&self) -> &'a Bdd {
        self.bdd
    }

    pub fn graph(&self) -> &'a ReachabilityGraph {
        self.graph
    }

    pub fn observer(&self) -> &'a dyn AnalysisObserver {
        self.observer
    }

    /// Union `headers` into `sets[node]`. Returns the part of `headers` that was not there before.
    fn merge(&self, sets: &mut StateSets, node: NodeId, headers: Ref) -> Ref {
        if self.bdd.is_zero(headers) {
            return headers;
        }
        match sets.get_mut(&node) {
            Some(old) => {
                let fresh = self.bdd.apply_diff(headers, *old);
                if !self.bdd.is_zero(fresh) {
                    *old = self.bdd.apply_or(*old, headers);
                }
                fresh
            }
            None => {
                sets.insert(node, headers);
                headers
            }
        }
    }

    /// One forward step: the images of every frontier predicate along every outgoing edge,
    /// unioned per target. Targets receiving only empty images are left out.
    pub fn propagate_forward(&self, frontier: &StateSets) -> StateSets {
        let mut next = StateSets::new();
        for (&node, &headers) in frontier {
            if self.bdd.is_zero(headers) {
                continue;
            }
            for &(post, e) in self.graph.successors(node) {
                let image = self.graph.edge(e).traverse_forward(self.bdd, headers);
                self.merge(&mut next, post, image);
            }
        }
        next
    }

    /// Close `sets` under backward traversal: afterwards `sets[n]` holds every header at `n`
    /// that can reach one of the initial predicates.
    pub fn backward_fixpoint(&self, sets: &mut StateSets) {
        let start = Instant::now();
        let mut dirty: BTreeSet<NodeId> = sets
            .iter()
            .filter(|&(_, &p)| !self.bdd.is_zero(p))
            .map(|(&n, _)| n)
            .collect();

        let mut rounds = 0;
        while !dirty.is_empty() {
            rounds += 1;
            let mut next = BTreeSet::new();
            for post in dirty {
                let headers = sets[&post];
                for &(pre, e) in self.graph.predecessors(post) {
                    let preimage = self.graph.edge(e).traverse_backward(self.bdd, headers);
                    if !self.bdd.is_zero(self.merge(sets, pre, preimage)) {
                        next.insert(pre);
                    }
                }
            }
            self.observer.round(Phase::BackwardFixpoint, rounds, next.len());
            self.observer.snapshot(Phase::BackwardFixpoint, rounds, sets);
            dirty = next;
        }

        debug!("backward fixpoint converged after {} rounds", rounds);
        self.observer
            .phase_finished(Phase::BackwardFixpoint, rounds, start.elapsed());
    }

    /// Forward propagation from `seed` for at most `rounds` steps, accumulating everything
    /// that reaches each node (the seed included).
    ///
    /// Only the headers that are new at a node are propagated further. Since forward
    /// traversal distributes over union, a round that adds nothing means the accumulated
    /// sets are already closed, and the sweep stops early.
    pub fn bounded_forward_sweep(&self, seed: &StateSets, rounds: usize) -> StateSets {
        let start = Instant::now();
        let mut total = StateSets::new();
        for (&node, &headers) in seed {
            self.merge(&mut total, node, headers);
        }
        let mut frontier = total.clone();

        let mut round = 0;
        while round < rounds && !frontier.is_empty() {
            round += 1;
            let image = self.propagate_forward(&frontier);
            frontier.clear();
            for (node, headers) in image {
                let fresh = self.merge(&mut total, node, headers);
                if !self.bdd.is_zero(fresh) {
                    frontier.insert(node, fresh);
                }
            }
            self.observer.round(Phase::ForwardSweep, round, frontier.len());
            self.observer.snapshot(Phase::ForwardSweep, round, &total);
        }

        if frontier.is_empty() {
            debug!("forward sweep closed after {} rounds", round);
        } else {
            debug!("forward sweep stopped at the bound of {} rounds", rounds);
        }
        self.observer.phase_finished(Phase::ForwardSweep, round, start.elapsed());
        total
    }

    /// Everything reachable from `seed` in at least one step.
    ///
    /// `stop` is consulted with the current accumulation after each round and may end
    /// the computation before the fixpoint is reached.
    pub fn forward_fixpoint_until(&self, seed: &StateSets, mut stop: impl FnMut(&StateSets) -> bool) -> StateSets {
        let start = Instant::now();
        let mut total = StateSets::new();
        let mut frontier = seed.clone();

        let mut round = 0;
        while !frontier.is_empty() {
            round += 1;
            let image = self.propagate_forward(&frontier);
            frontier.clear();
            for (node, headers) in image {
                let fresh = self.merge(&mut total, node, headers);
                if !self.bdd.is_zero(fresh) {
                    frontier.insert(node, fresh);
                }
            }
            self.observer.round(Phase::ForwardFixpoint, round, frontier.len());
            self.observer.snapshot(Phase::ForwardFixpoint, round, &total);
            if stop(&total) {
                break;
            }
        }

        self.observer
            .phase_finished(Phase::ForwardFixpoint, round, start.elapsed());
        total
    }

    /// Headers at `node` that can come back to `node` after one or more edges.
    pub fn recurrent_headers(&self, node: NodeId) -> Ref {
        let mut sets = StateSets::new();
        for &(pre, e) in self.graph.predecessors(node) {
            let entering = self.graph.edge(e).traverse_backward(self.bdd, self.bdd.one());
            self.merge(&mut sets, pre, entering);
        }
        self.backward_fixpoint(&mut sets);
        sets.get(&node).copied().unwrap_or(Ref::ZERO)
    }

    /// Restrict `sets` to ingress nodes, keyed by location. Every ingress location is present.
    pub fn project_ingress(&self, sets: &StateSets) -> BTreeMap<IngressLocation, Ref> {
        self.graph
            .ingress_nodes()
            .iter()
            .map(|(location, id)| (location.clone(), sets.get(id).copied().unwrap_or(Ref::ZERO)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::graph::GraphBuilder;
    use crate::observer::{Event, NoopObserver, RecordingObserver};
    use crate::state::StateNode;
    use crate::transition::Transition;

    // I -> A -> B -> Q, with B -> A constrained to x1.
    fn chain(bdd: &Bdd) -> (ReachabilityGraph, [NodeId; 4]) {
        let mut builder = GraphBuilder::new();
        let i = builder.ingress(StateNode::originate_vrf("r1", "default")).unwrap();
        let a = builder.node(StateNode::post_in_vrf("r1", "default"));
        let b = builder.node(StateNode::pre_out_vrf("r1", "default"));
        let q = builder.query();
        builder.edge(i, a, Transition::Identity).unwrap();
        builder.edge(a, b, Transition::constraint(bdd.mk_var(2))).unwrap();
        builder.edge(b, a, Transition::constraint(bdd.mk_var(1))).unwrap();
        builder.edge(b, q, Transition::Identity).unwrap();
        (builder.build().unwrap(), [i, a, b, q])
    }

    #[test]
    fn test_propagate_forward() {
        let bdd = Bdd::default();
        let (graph, [i, a, b, _]) = chain(&bdd);
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);

        let step = engine.propagate_forward(&StateSets::from([(i, bdd.one())]));
        assert_eq!(step, StateSets::from([(a, bdd.one())]));

        let step = engine.propagate_forward(&StateSets::from([(a, -bdd.mk_var(2))]));
        assert!(step.is_empty(), "empty images must not be reported");
        assert!(!step.contains_key(&b));
    }

    #[test]
    fn test_backward_fixpoint() {
        let bdd = Bdd::default();
        let (graph, [i, a, b, q]) = chain(&bdd);
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);

        let mut sets = StateSets::from([(q, bdd.mk_var(3))]);
        engine.backward_fixpoint(&mut sets);

        let x2x3 = bdd.mk_cube([2, 3]);
        assert_eq!(sets[&b], bdd.mk_var(3));
        assert_eq!(sets[&a], x2x3);
        assert_eq!(sets[&i], x2x3);
    }

    /// Keeps a copy of the sets after every round.
    #[derive(Default)]
    struct Snapshots(parking_lot::Mutex<Vec<(Phase, usize, StateSets)>>);

    impl AnalysisObserver for Snapshots {
        fn snapshot(&self, phase: Phase, round: usize, sets: &StateSets) {
            self.0.lock().push((phase, round, sets.clone()));
        }
    }

    impl Snapshots {
        fn assert_monotone(&self, bdd: &Bdd, phase: Phase) -> usize {
            let snapshots: Vec<StateSets> = self
                .0
                .lock()
                .iter()
                .filter(|(p, ..)| *p == phase)
                .map(|(_, _, sets)| sets.clone())
                .collect();
            for pair in snapshots.windows(2) {
                let (prev, cur) = (&pair[0], &pair[1]);
                for (node, &headers) in prev {
                    let grown = cur.get(node).copied().unwrap_or(Ref::ZERO);
                    assert!(bdd.is_implies(headers, grown), "{} shrank at {}", phase, node);
                }
            }
            snapshots.len()
        }
    }

    #[test]
    fn test_backward_fixpoint_rounds_are_monotone() {
        let bdd = Bdd::default();
        let (graph, [i, a, b, q]) = chain(&bdd);
        let observer = Snapshots::default();
        let engine = FixpointEngine::new(&bdd, &graph, &observer);

        let mut sets = StateSets::from([(q, bdd.one())]);
        engine.backward_fixpoint(&mut sets);

        let rounds = observer.assert_monotone(&bdd, Phase::BackwardFixpoint);
        assert!(rounds >= 3);
        let first = observer.0.lock()[0].2.clone();
        assert_eq!(first, StateSets::from([(q, bdd.one()), (b, bdd.one())]));
        assert_eq!(sets[&a], bdd.mk_var(2));
        assert_eq!(sets[&i], bdd.mk_var(2));
    }

    #[test]
    fn test_forward_fixpoint_rounds_are_monotone() {
        let bdd = Bdd::default();
        let (graph, [i, _, _, q]) = chain(&bdd);
        let observer = Snapshots::default();
        let engine = FixpointEngine::new(&bdd, &graph, &observer);

        let seed = StateSets::from([(i, bdd.one())]);
        let total = engine.forward_fixpoint_until(&seed, |_| false);
        assert!(observer.assert_monotone(&bdd, Phase::ForwardFixpoint) >= 3);
        engine.bounded_forward_sweep(&seed, 100);
        assert!(observer.assert_monotone(&bdd, Phase::ForwardSweep) >= 3);
        assert!(total.contains_key(&q));
    }

    #[test]
    fn test_round_events_are_consecutive() {
        let bdd = Bdd::default();
        let (graph, [_, _, _, q]) = chain(&bdd);
        let observer = RecordingObserver::new();
        let engine = FixpointEngine::new(&bdd, &graph, &observer);

        let mut sets = StateSets::from([(q, bdd.one())]);
        engine.backward_fixpoint(&mut sets);

        let rounds: Vec<usize> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Round { round, .. } => Some(round),
                _ => None,
            })
            .collect();
        assert!(rounds.windows(2).all(|w| w[0] + 1 == w[1]));
        assert_eq!(observer.phases(), vec![(Phase::BackwardFixpoint, rounds.len())]);
    }

    #[test]
    fn test_sweep_grows_with_rounds() {
        let bdd = Bdd::default();
        let (graph, [i, ..]) = chain(&bdd);
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);
        let seed = StateSets::from([(i, bdd.one())]);

        let mut previous = StateSets::new();
        for rounds in 0..6 {
            let current = engine.bounded_forward_sweep(&seed, rounds);
            for (node, &headers) in &previous {
                assert!(bdd.is_implies(headers, current[node]));
            }
            previous = current;
        }
        assert_eq!(previous, engine.bounded_forward_sweep(&seed, 1000));
    }

    #[test]
    fn test_sweep_stops_when_closed() {
        let bdd = Bdd::default();
        let (graph, [i, a, b, q]) = chain(&bdd);
        let observer = RecordingObserver::new();
        let engine = FixpointEngine::new(&bdd, &graph, &observer);

        let total = engine.bounded_forward_sweep(&StateSets::from([(i, bdd.one())]), 1280);
        assert_eq!(total[&i], bdd.one());
        assert_eq!(total[&a], bdd.one());
        assert_eq!(total[&b], bdd.mk_var(2));
        assert_eq!(total[&q], bdd.mk_var(2));

        let (_, rounds) = observer.phases()[0];
        assert!(rounds < 10, "sweep ran {} rounds", rounds);
    }

    #[test]
    fn test_forward_fixpoint_excludes_seed() {
        let bdd = Bdd::default();
        let (graph, [i, a, b, _]) = chain(&bdd);
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);

        let reach = engine.forward_fixpoint_until(&StateSets::from([(i, bdd.one())]), |_| false);
        assert!(!reach.contains_key(&i));

        let back = engine.forward_fixpoint_until(&StateSets::from([(a, bdd.one())]), |_| false);
        assert_eq!(back[&a], bdd.mk_cube([1, 2]));

        let mut calls = 0;
        engine.forward_fixpoint_until(&StateSets::from([(a, bdd.one())]), |r| {
            calls += 1;
            r.contains_key(&b)
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_recurrent_headers() {
        let bdd = Bdd::default();
        let (graph, [i, a, b, q]) = chain(&bdd);
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);

        let x1x2 = bdd.mk_cube([1, 2]);
        assert_eq!(engine.recurrent_headers(a), x1x2);
        assert_eq!(engine.recurrent_headers(b), x1x2);
        assert_eq!(engine.recurrent_headers(i), bdd.zero());
        assert_eq!(engine.recurrent_headers(q), bdd.zero());
    }

    #[test]
    fn test_project_ingress() {
        let bdd = Bdd::default();
        let (graph, [i, a, ..]) = chain(&bdd);
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);

        let projected = engine.project_ingress(&StateSets::from([(a, bdd.one())]));
        assert_eq!(projected.len(), 1);
        assert_eq!(projected.values().next(), Some(&bdd.zero()));

        let projected = engine.project_ingress(&StateSets::from([(i, bdd.mk_var(4))]));
        assert_eq!(projected[&IngressLocation::vrf("r1", "default")], bdd.mk_var(4));
    }
}
