//! The reachability graph: state nodes connected by header-transforming edges.
//!
//! Nodes and edges live in arenas and are addressed by [`NodeId`] and [`EdgeId`].
//! The graph is assembled once by a [`GraphBuilder`] and never changes afterwards;
//! the reverse index is derived from forward adjacency at build time and verified.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};

use log::debug;

use crate::bdd::Bdd;
use crate::error::{ReachError, Result};
use crate::ingress::{to_ingress_location, IngressLocation};
use crate::reference::Ref;
use crate::state::StateNode;
use crate::transition::Transition;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EdgeId(u32);

impl EdgeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for EdgeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pre: NodeId,
    post: NodeId,
    transition: Transition,
}

impl Edge {
    pub fn pre(&self) -> NodeId {
        self.pre
    }

    pub fn post(&self) -> NodeId {
        self.post
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    pub fn traverse_forward(&self, bdd: &Bdd, headers: Ref) -> Ref {
        self.transition.traverse_forward(bdd, headers)
    }

    pub fn traverse_backward(&self, bdd: &Bdd, headers: Ref) -> Ref {
        self.transition.traverse_backward(bdd, headers)
    }
}

/// Accumulates states, edges and ingress points, then freezes them into a [`ReachabilityGraph`].
#[derive(Debug)]
pub struct GraphBuilder {
    states: Vec<StateNode>,
    ids: HashMap<StateNode, NodeId>,
    edges: Vec<Edge>,
    pairs: HashMap<(NodeId, NodeId), EdgeId>,
    ingress: BTreeMap<IngressLocation, NodeId>,
    query_headers: Ref,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            ids: HashMap::new(),
            edges: Vec::new(),
            pairs: HashMap::new(),
            ingress: BTreeMap::new(),
            query_headers: Ref::ONE,
        }
    }

    /// Intern a state, returning the existing id if it is already known.
    ///
    /// Interning an `Originate*` state does not make it an ingress point; register
    /// those with [`ingress`][Self::ingress].
    pub fn node(&mut self, state: StateNode) -> NodeId {
        if let Some(&id) = self.ids.get(&state) {
            return id;
        }
        let id = NodeId(self.states.len() as u32);
        self.states.push(state.clone());
        self.ids.insert(state, id);
        id
    }

    /// The query node, interned on first use.
    pub fn query(&mut self) -> NodeId {
        self.node(StateNode::Query)
    }

    /// Register an ingress state. Only `Originate*` states qualify.
    pub fn ingress(&mut self, state: StateNode) -> Result<NodeId> {
        let location = to_ingress_location(&state)?;
        let id = self.node(state);
        self.ingress.insert(location, id);
        Ok(id)
    }

    /// Headers of interest once a packet reaches the query node.
    pub fn query_headers(&mut self, headers: Ref) -> &mut Self {
        self.query_headers = headers;
        self
    }

    /// Add an edge between two interned nodes.
    ///
    /// Ids are plain indices: an id handed out by another builder is only caught as
    /// [`UnknownNode`][ReachError::UnknownNode] when it is out of range for this one.
    pub fn edge(&mut self, pre: NodeId, post: NodeId, transition: Transition) -> Result<EdgeId> {
        for id in [pre, post] {
            if id.index() >= self.states.len() {
                return Err(ReachError::UnknownNode(id));
            }
        }
        if self.pairs.contains_key(&(pre, post)) {
            return Err(ReachError::DuplicateEdge {
                pre: self.states[pre.index()].clone(),
                post: self.states[post.index()].clone(),
            });
        }

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge { pre, post, transition });
        self.pairs.insert((pre, post), id);
        Ok(id)
    }

    /// Same as [`edge`][Self::edge], interning both states first.
    /// Like [`node`][Self::node], this never registers an ingress point.
    pub fn connect(&mut self, pre: StateNode, post: StateNode, transition: Transition) -> Result<EdgeId> {
        let pre = self.node(pre);
        let post = self.node(post);
        self.edge(pre, post, transition)
    }

    pub fn build(mut self) -> Result<ReachabilityGraph> {
        let query = self.query();

        let n = self.states.len();
        let mut forward: Vec<Vec<(NodeId, EdgeId)>> = vec![Vec::new(); n];
        let mut reverse: Vec<Vec<(NodeId, EdgeId)>> = vec![Vec::new(); n];
        for (i, edge) in self.edges.iter().enumerate() {
            let id = EdgeId(i as u32);
            forward[edge.pre.index()].push((edge.post, id));
        }
        for (a, out) in forward.iter().enumerate() {
            for &(b, e) in out {
                reverse[b.index()].push((NodeId(a as u32), e));
            }
        }

        if let Some(&(post, _)) = forward[query.index()].first() {
            return Err(ReachError::QueryHasOutEdges(self.states[post.index()].clone()));
        }

        let graph = ReachabilityGraph {
            states: self.states,
            ids: self.ids,
            edges: self.edges,
            forward,
            reverse,
            ingress: self.ingress,
            query,
            query_headers: self.query_headers,
        };
        graph.check_reverse_index()?;
        debug!(
            "built reachability graph: {} nodes, {} edges, {} ingress",
            graph.node_count(),
            graph.edge_count(),
            graph.ingress.len()
        );
        Ok(graph)
    }
}

#[derive(Debug)]
pub struct ReachabilityGraph {
    states: Vec<StateNode>,
    ids: HashMap<StateNode, NodeId>,
    edges: Vec<Edge>,
    forward: Vec<Vec<(NodeId, EdgeId)>>,
    reverse: Vec<Vec<(NodeId, EdgeId)>>,
    ingress: BTreeMap<IngressLocation, NodeId>,
    query: NodeId,
    query_headers: Ref,
}

impl ReachabilityGraph {
    pub fn node_count(&self) -> usize {
        self.states.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.states.len() as u32).map(NodeId)
    }

    pub fn state(&self, id: NodeId) -> &StateNode {
        &self.states[id.index()]
    }

    pub fn id_of(&self, state: &StateNode) -> Option<NodeId> {
        self.ids.get(state).copied()
    }

    /// Outgoing `(post, edge)` pairs of `id`.
    pub fn successors(&self, id: NodeId) -> &[(NodeId, EdgeId)] {
        &self.forward[id.index()]
    }

    /// Incoming `(pre, edge)` pairs of `id`.
    pub fn predecessors(&self, id: NodeId) -> &[(NodeId, EdgeId)] {
        &self.reverse[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().enumerate().map(|(i, e)| (EdgeId(i as u32), e))
    }

    /// Ingress locations with their nodes, ordered by location.
    pub fn ingress_nodes(&self) -> &BTreeMap<IngressLocation, NodeId> {
        &self.ingress
    }

    pub fn query(&self) -> NodeId {
        self.query
    }

    pub fn query_headers(&self) -> Ref {
        self.query_headers
    }

    /// Verify that `reverse[b]` holds `(a, e)` exactly when `forward[a]` holds `(b, e)`.
    pub fn check_reverse_index(&self) -> Result<()> {
        let mismatch = |a: NodeId, b: NodeId| ReachError::ReverseIndexMismatch {
            pre: self.state(a).clone(),
            post: self.state(b).clone(),
        };

        for (e, edge) in self.edges() {
            if !self.successors(edge.pre).contains(&(edge.post, e)) {
                return Err(mismatch(edge.pre, edge.post));
            }
        }

        // Each forward entry names its own edge and appears exactly once on both sides.
        for a in self.nodes() {
            for &(b, e) in self.successors(a) {
                match self.edges.get(e.index()) {
                    Some(edge) if edge.pre == a && edge.post == b => {}
                    _ => return Err(mismatch(a, b)),
                }
                let forward = self.successors(a).iter().filter(|&&x| x == (b, e)).count();
                let reverse = self.predecessors(b).iter().filter(|&&x| x == (a, e)).count();
                if forward != 1 || reverse != 1 {
                    return Err(mismatch(a, b));
                }
            }
        }

        for b in self.nodes() {
            for &(a, e) in self.predecessors(b) {
                if !self.successors(a).contains(&(b, e)) {
                    return Err(mismatch(a, b));
                }
            }
        }

        Ok(())
    }
}
