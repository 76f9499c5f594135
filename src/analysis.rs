//! The analysis facade.
//!
//! A [`ReachabilityAnalysis`] owns an immutable graph and answers any number of
//! queries about it. Every query works on its own scratch state; the only value kept
//! between queries is the path database, built on first use.
//!
//! ```
//! use std::sync::Arc;
//!
//! use bdd_reach::analysis::ReachabilityAnalysis;
//! use bdd_reach::bdd::Bdd;
//! use bdd_reach::graph::GraphBuilder;
//! use bdd_reach::ingress::IngressLocation;
//! use bdd_reach::state::StateNode;
//! use bdd_reach::transition::Transition;
//!
//! let bdd = Arc::new(Bdd::default());
//! let x1 = bdd.mk_var(1);
//!
//! let mut builder = GraphBuilder::new();
//! let ingress = builder.ingress(StateNode::originate_vrf("r1", "default")).unwrap();
//! let vrf = builder.node(StateNode::post_in_vrf("r1", "default"));
//! let query = builder.query();
//! builder.edge(ingress, vrf, Transition::Identity).unwrap();
//! builder.edge(vrf, vrf, Transition::constraint(x1)).unwrap();
//! builder.edge(vrf, query, Transition::constraint(-x1)).unwrap();
//!
//! let analysis = ReachabilityAnalysis::new(bdd.clone(), builder.build().unwrap());
//! let location = IngressLocation::vrf("r1", "default");
//! assert_eq!(analysis.reverse_reachable()[&location], -x1);
//! assert_eq!(analysis.detect_loops()[&location], x1);
//! ```

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use log::info;

use crate::bdd::Bdd;
use crate::config::AnalysisConfig;
use crate::fixpoint::{FixpointEngine, StateSets};
use crate::graph::ReachabilityGraph;
use crate::ingress::IngressLocation;
use crate::loops::{BoundedRounds, LoopStrategy, PathDb};
use crate::observer::{AnalysisObserver, NoopObserver};
use crate::reference::Ref;

pub struct ReachabilityAnalysis {
    bdd: Arc<Bdd>,
    graph: ReachabilityGraph,
    config: AnalysisConfig,
    observer: Arc<dyn AnalysisObserver>,
    path_db: OnceLock<PathDb>,
}

impl ReachabilityAnalysis {
    pub fn new(bdd: Arc<Bdd>, graph: ReachabilityGraph) -> Self {
        Self::with_config(bdd, graph, AnalysisConfig::default())
    }

    pub fn with_config(bdd: Arc<Bdd>, graph: ReachabilityGraph, config: AnalysisConfig) -> Self {
        Self {
            bdd,
            graph,
            config,
            observer: Arc::new(NoopObserver),
            path_db: OnceLock::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AnalysisObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    pub fn graph(&self) -> &ReachabilityGraph {
        &self.graph
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn engine(&self) -> FixpointEngine<'_> {
        FixpointEngine::new(&self.bdd, &self.graph, self.observer.as_ref())
    }

    /// Headers at every node that can reach the query node inside the query headers.
    pub fn reverse_reachable_states(&self) -> StateSets {
        let mut sets = StateSets::from([(self.graph.query(), self.graph.query_headers())]);
        self.engine().backward_fixpoint(&mut sets);
        sets
    }

    /// Headers that, injected at each ingress location, can reach the query.
    pub fn reverse_reachable(&self) -> BTreeMap<IngressLocation, Ref> {
        self.engine().project_ingress(&self.reverse_reachable_states())
    }

    /// Loop predicate per ingress location, using the configured strategy.
    pub fn detect_loops(&self) -> BTreeMap<IngressLocation, Ref> {
        self.detect_loops_with(self.config.loop_strategy)
    }

    pub fn detect_loops_with(&self, strategy: LoopStrategy) -> BTreeMap<IngressLocation, Ref> {
        let start = Instant::now();
        let result = strategy.detector().detect(self);
        let looping = result.values().filter(|&&headers| !self.bdd.is_zero(headers)).count();
        info!(
            "{}: {} of {} ingress locations can loop ({:.3} s)",
            strategy,
            looping,
            result.len(),
            start.elapsed().as_secs_f64()
        );
        result
    }

    /// Per-node loop states found by the bounded-rounds detector.
    pub fn loop_states(&self) -> StateSets {
        BoundedRounds::loop_states(&self.engine(), self.config.candidate_rounds())
    }

    pub fn path_db(&self) -> &PathDb {
        self.path_db.get_or_init(|| PathDb::build(&self.engine()))
    }
}

impl Debug for ReachabilityAnalysis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReachabilityAnalysis")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("config", &self.config)
            .field("path_db", &self.path_db.get().map(PathDb::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::graph::GraphBuilder;
    use crate::observer::{Phase, RecordingObserver};
    use crate::state::StateNode;
    use crate::transition::Transition;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_analysis_is_send_sync() {
        assert_send_sync::<ReachabilityAnalysis>();
    }

    #[test]
    fn test_path_db_is_cached() {
        let bdd = Arc::new(Bdd::default());
        let mut builder = GraphBuilder::new();
        let i = builder.ingress(StateNode::originate_vrf("r1", "default")).unwrap();
        let a = builder.node(StateNode::post_in_vrf("r1", "default"));
        builder.edge(i, a, Transition::Identity).unwrap();
        builder.edge(a, a, Transition::Identity).unwrap();

        let observer = Arc::new(RecordingObserver::new());
        let analysis = ReachabilityAnalysis::new(bdd, builder.build().unwrap()).with_observer(observer.clone());

        let first = analysis.path_db() as *const PathDb;
        let second = analysis.path_db() as *const PathDb;
        assert_eq!(first, second);

        let builds = observer
            .phases()
            .iter()
            .filter(|(phase, _)| *phase == Phase::PathSearch)
            .count();
        assert_eq!(builds, 1);
    }

    #[test]
    fn test_unreachable_ingress_maps_to_zero() {
        let bdd = Arc::new(Bdd::default());
        let mut builder = GraphBuilder::new();
        builder.ingress(StateNode::originate_vrf("r1", "default")).unwrap();
        builder.ingress(StateNode::originate_interface_link("r2", "eth0")).unwrap();
        let analysis = ReachabilityAnalysis::new(bdd.clone(), builder.build().unwrap());

        let reach = analysis.reverse_reachable();
        assert_eq!(reach.len(), 2);
        assert!(reach.values().all(|&headers| bdd.is_zero(headers)));
        assert!(analysis.loop_states().is_empty());
    }
}
