//! Enumeration of every simple path from every ingress node.
//!
//! The resulting [`PathDb`] is expensive (exponential in the worst case) and is
//! computed at most once per analysis.

use std::collections::BTreeMap;
use std::time::Instant;

use log::debug;

use super::LoopDetectionStrategy;
use crate::analysis::ReachabilityAnalysis;
use crate::bdd::Bdd;
use crate::fixpoint::FixpointEngine;
use crate::graph::{EdgeId, NodeId};
use crate::ingress::IngressLocation;
use crate::observer::Phase;
use crate::reference::Ref;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PathRecord {
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
    headers: Ref,
    ingress_headers: Ref,
}

impl PathRecord {
    /// Visited nodes, ingress first. For a cyclic record the last node also appears earlier.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Headers arriving at the last node.
    pub fn headers(&self) -> Ref {
        self.headers
    }

    /// Headers at the ingress node that can take the whole path.
    pub fn ingress_headers(&self) -> Ref {
        self.ingress_headers
    }

    pub fn is_cyclic(&self) -> bool {
        match self.nodes.split_last() {
            Some((last, rest)) => rest.contains(last),
            None => false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct PathDb {
    records: BTreeMap<IngressLocation, Vec<PathRecord>>,
}

struct Partial {
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
    headers: Ref,
}

impl PathDb {
    pub fn build(engine: &FixpointEngine<'_>) -> Self {
        let start = Instant::now();
        let graph = engine.graph();
        let bdd = engine.bdd();

        let mut records = BTreeMap::new();
        let mut total = 0;
        for (location, &ingress) in graph.ingress_nodes() {
            let mut found = Vec::new();
            let mut stack = vec![Partial {
                nodes: vec![ingress],
                edges: Vec::new(),
                headers: bdd.one(),
            }];

            while let Some(partial) = stack.pop() {
                let last = *partial.nodes.last().unwrap_or(&ingress);
                let mut extended = false;
                for &(post, e) in graph.successors(last) {
                    let image = graph.edge(e).traverse_forward(bdd, partial.headers);
                    if bdd.is_zero(image) {
                        continue;
                    }
                    extended = true;

                    let mut nodes = partial.nodes.clone();
                    let mut edges = partial.edges.clone();
                    let revisit = nodes.contains(&post);
                    nodes.push(post);
                    edges.push(e);
                    if revisit {
                        found.push(Self::record(engine, nodes, edges, image));
                    } else {
                        stack.push(Partial {
                            nodes,
                            edges,
                            headers: image,
                        });
                    }
                }
                if !extended {
                    found.push(Self::record(engine, partial.nodes, partial.edges, partial.headers));
                }
            }

            debug!("{} paths from {}", found.len(), location);
            total += found.len();
            records.insert(location.clone(), found);
        }

        engine
            .observer()
            .phase_finished(Phase::PathSearch, total, start.elapsed());
        Self { records }
    }

    fn record(engine: &FixpointEngine<'_>, nodes: Vec<NodeId>, edges: Vec<EdgeId>, headers: Ref) -> PathRecord {
        let graph = engine.graph();
        let bdd = engine.bdd();
        let ingress_headers = edges
            .iter()
            .rev()
            .fold(bdd.one(), |acc, &e| graph.edge(e).traverse_backward(bdd, acc));
        PathRecord {
            nodes,
            edges,
            headers,
            ingress_headers,
        }
    }

    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self, location: &IngressLocation) -> &[PathRecord] {
        self.records.get(location).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IngressLocation, &PathRecord)> {
        self.records
            .iter()
            .flat_map(|(location, records)| records.iter().map(move |r| (location, r)))
    }

    /// Union of the ingress-side headers of the cyclic records, per ingress location.
    pub fn loop_headers(&self, bdd: &Bdd) -> BTreeMap<IngressLocation, Ref> {
        self.records
            .iter()
            .map(|(location, records)| {
                let cyclic = records.iter().filter(|r| r.is_cyclic()).map(|r| r.ingress_headers);
                (location.clone(), bdd.apply_or_many(cyclic))
            })
            .collect()
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct PathEnumeration;

impl LoopDetectionStrategy for PathEnumeration {
    fn name(&self) -> &'static str {
        "path-enumeration"
    }

    fn detect(&self, analysis: &ReachabilityAnalysis) -> BTreeMap<IngressLocation, Ref> {
        analysis.path_db().loop_headers(analysis.bdd())
    }
}
