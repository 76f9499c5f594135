//! Depth-first lasso search with explicit path history.

use std::collections::BTreeMap;
use std::time::Instant;

use log::debug;

use super::LoopDetectionStrategy;
use crate::analysis::ReachabilityAnalysis;
use crate::fixpoint::FixpointEngine;
use crate::graph::{EdgeId, NodeId};
use crate::ingress::IngressLocation;
use crate::observer::Phase;
use crate::reference::Ref;

/// A path from an ingress node that closes back onto itself.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LoopWitness {
    /// Nodes from the ingress up to the last node before the closing edge.
    pub path: Vec<NodeId>,
    /// The revisited node.
    pub node: NodeId,
    /// Headers at the ingress that can take the whole lasso.
    pub ingress_headers: Ref,
}

#[derive(Debug, Copy, Clone)]
struct Frame {
    node: NodeId,
    headers: Ref,
    entered_by: Option<EdgeId>,
    cursor: usize,
}

#[derive(Debug, Default, Copy, Clone)]
pub struct PathHistoryDfs;

impl PathHistoryDfs {
    /// Every lasso reachable from `ingress` with a non-empty header set.
    pub fn witnesses(engine: &FixpointEngine<'_>, ingress: NodeId) -> Vec<LoopWitness> {
        let graph = engine.graph();
        let bdd = engine.bdd();

        let mut witnesses = Vec::new();
        let mut on_stack = vec![false; graph.node_count()];
        let mut stack = vec![Frame {
            node: ingress,
            headers: bdd.one(),
            entered_by: None,
            cursor: 0,
        }];
        on_stack[ingress.index()] = true;

        while let Some(&Frame {
            node, headers, cursor, ..
        }) = stack.last()
        {
            let successors = graph.successors(node);
            if cursor == successors.len() {
                on_stack[node.index()] = false;
                stack.pop();
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.cursor += 1;
            }

            let (post, e) = successors[cursor];
            let image = graph.edge(e).traverse_forward(bdd, headers);
            if bdd.is_zero(image) {
                continue;
            }

            if on_stack[post.index()] {
                // Fold the lasso backwards, closing edge first.
                let ingress_headers = stack
                    .iter()
                    .rev()
                    .filter_map(|frame| frame.entered_by)
                    .fold(graph.edge(e).traverse_backward(bdd, bdd.one()), |acc, e| {
                        graph.edge(e).traverse_backward(bdd, acc)
                    });
                debug!("lasso at {} after {} hops", graph.state(post), stack.len());
                witnesses.push(LoopWitness {
                    path: stack.iter().map(|frame| frame.node).collect(),
                    node: post,
                    ingress_headers,
                });
                continue;
            }

            on_stack[post.index()] = true;
            stack.push(Frame {
                node: post,
                headers: image,
                entered_by: Some(e),
                cursor: 0,
            });
        }

        witnesses
    }
}

impl LoopDetectionStrategy for PathHistoryDfs {
    fn name(&self) -> &'static str {
        "path-history-dfs"
    }

    fn detect(&self, analysis: &ReachabilityAnalysis) -> BTreeMap<IngressLocation, Ref> {
        let engine = analysis.engine();
        let bdd = engine.bdd();
        let start = Instant::now();
        let mut total = 0;

        let result = engine
            .graph()
            .ingress_nodes()
            .iter()
            .map(|(location, &ingress)| {
                let witnesses = Self::witnesses(&engine, ingress);
                total += witnesses.len();
                let headers = bdd.apply_or_many(witnesses.iter().map(|w| w.ingress_headers));
                (location.clone(), headers)
            })
            .collect();

        engine
            .observer()
            .phase_finished(Phase::PathSearch, total, start.elapsed());
        result
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bdd::Bdd;
    use crate::graph::GraphBuilder;
    use crate::observer::NoopObserver;
    use crate::state::StateNode;
    use crate::transition::Transition;

    #[test]
    fn test_witnesses_of_two_cycles() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);
        let x2 = bdd.mk_var(2);

        // I -> A -> B -> A (needs x1), A -> C -> C (needs x2).
        let mut builder = GraphBuilder::new();
        let i = builder.ingress(StateNode::originate_vrf("r1", "default")).unwrap();
        let a = builder.node(StateNode::post_in_vrf("r1", "default"));
        let b = builder.node(StateNode::pre_out_vrf("r1", "default"));
        let c = builder.node(StateNode::pre_out_edge("r1", "eth0"));
        builder.edge(i, a, Transition::Identity).unwrap();
        builder.edge(a, b, Transition::Identity).unwrap();
        builder.edge(b, a, Transition::constraint(x1)).unwrap();
        builder.edge(a, c, Transition::Identity).unwrap();
        builder.edge(c, c, Transition::constraint(x2)).unwrap();
        let graph = builder.build().unwrap();
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);

        let witnesses = PathHistoryDfs::witnesses(&engine, i);
        assert_eq!(
            witnesses,
            vec![
                LoopWitness {
                    path: vec![i, a, b],
                    node: a,
                    ingress_headers: x1,
                },
                LoopWitness {
                    path: vec![i, a, c],
                    node: c,
                    ingress_headers: x2,
                },
            ]
        );
    }

    #[test]
    fn test_empty_images_are_pruned() {
        let bdd = Bdd::default();
        let x1 = bdd.mk_var(1);

        // I -> A keeps only x1, A -> A keeps only ¬x1.
        let mut builder = GraphBuilder::new();
        let i = builder.ingress(StateNode::originate_vrf("r1", "default")).unwrap();
        let a = builder.node(StateNode::post_in_vrf("r1", "default"));
        builder.edge(i, a, Transition::constraint(x1)).unwrap();
        builder.edge(a, a, Transition::constraint(-x1)).unwrap();
        let graph = builder.build().unwrap();
        let engine = FixpointEngine::new(&bdd, &graph, &NoopObserver);

        assert!(PathHistoryDfs::witnesses(&engine, i).is_empty());
    }
}
