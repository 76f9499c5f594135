use thiserror::Error;

use crate::graph::NodeId;
use crate::state::StateNode;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ReachError {
    #[error("{0} is not an ingress state")]
    NotIngress(StateNode),

    #[error("query state must be terminal, but has an edge to {0}")]
    QueryHasOutEdges(StateNode),

    #[error("duplicate edge {pre} -> {post}")]
    DuplicateEdge { pre: StateNode, post: StateNode },

    #[error("node {0} does not belong to this graph")]
    UnknownNode(NodeId),

    #[error("reverse index does not match forward adjacency at {pre} -> {post}")]
    ReverseIndexMismatch { pre: StateNode, post: StateNode },
}

pub type Result<T, E = ReachError> = std::result::Result<T, E>;
