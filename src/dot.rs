//! Reachability graph to DOT (Graphviz) conversion.
//!
//! Ingress nodes sit at the top (source rank), the query node at the bottom (sink rank).
//! Edges are labeled with their transitions. Nodes in a highlight set, such as the
//! loop states of an analysis, are filled.
//!
//! ```
//! use bdd_reach::graph::GraphBuilder;
//! use bdd_reach::state::StateNode;
//! use bdd_reach::transition::Transition;
//!
//! let mut builder = GraphBuilder::new();
//! builder
//!     .connect(StateNode::originate_vrf("r1", "default"), StateNode::Query, Transition::Identity)
//!     .unwrap();
//! let graph = builder.build().unwrap();
//!
//! let dot = graph.to_dot().unwrap();
//! assert!(dot.starts_with("digraph {"));
//! // Render with: dot -Tsvg graph.dot -o graph.svg
//! ```

use std::fmt::Write;

use crate::fixpoint::StateSets;
use crate::graph::ReachabilityGraph;

#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for interior nodes (default: "box")
    pub node_shape: &'static str,
    /// Shape for ingress nodes (default: "invhouse")
    pub ingress_shape: &'static str,
    /// Shape for the query node (default: "doublecircle")
    pub query_shape: &'static str,
    /// Fill color for highlighted nodes (default: "salmon")
    pub highlight_color: &'static str,
    /// Whether to label edges with their transitions (default: true)
    pub edge_labels: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "box",
            ingress_shape: "invhouse",
            query_shape: "doublecircle",
            highlight_color: "salmon",
            edge_labels: true,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl ReachabilityGraph {
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default(), &StateSets::new())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig, highlight: &StateSets) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        writeln!(dot, "{{ rank=source")?;
        for id in self.ingress_nodes().values() {
            writeln!(dot, "{} [shape={}];", id, config.ingress_shape)?;
        }
        writeln!(dot, "}}")?;
        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "{} [shape={}];", self.query(), config.query_shape)?;
        writeln!(dot, "}}")?;

        for id in self.nodes() {
            let label = escape(&self.state(id).to_string());
            if highlight.contains_key(&id) {
                writeln!(
                    dot,
                    "{} [label=\"{}\", style=filled, fillcolor={}];",
                    id, label, config.highlight_color
                )?;
            } else {
                writeln!(dot, "{} [label=\"{}\"];", id, label)?;
            }
        }

        for (_, edge) in self.edges() {
            if config.edge_labels {
                let label = escape(&edge.transition().to_string());
                writeln!(dot, "{} -> {} [label=\"{}\"];", edge.pre(), edge.post(), label)?;
            } else {
                writeln!(dot, "{} -> {};", edge.pre(), edge.post())?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
