//! # bdd-reach: symbolic packet reachability with BDDs
//!
//! **`bdd-reach`** answers two questions about a modeled network, for all packet headers at once:
//! which headers injected at an ingress location can reach a target condition, and which headers
//! get caught in a forwarding loop.
//!
//! ## Model
//!
//! A [`ReachabilityGraph`][crate::graph::ReachabilityGraph] has one node per point in the life of a
//! packet ([`StateNode`][crate::state::StateNode]: about to enter an interface, after a routing lookup
//! in a VRF, accepted, dropped, ...) and one edge per possible move between them. Each edge carries a
//! [`Transition`][crate::transition::Transition] that filters and rewrites header sets, represented as
//! BDDs over the header bits laid out by [`BddPacket`][crate::packet::BddPacket].
//!
//! The BDD manager is canonical: two header sets are equal iff their [`Ref`][crate::reference::Ref]
//! handles are equal. All fixpoints use this to detect convergence.
//!
//! ## Loops
//!
//! A graph cycle is not a forwarding loop by itself: only some headers may take it, and headers may
//! be rewritten along the way. The loop predicate of an ingress location is the set of headers that,
//! injected there, can come back to a state they have already visited. Since the model has no TTL,
//! on cycles that only filter such packets circle forever; with rewriting edges a revisit may
//! happen only once. See the [`loops`] module for the available strategies.
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bdd_reach::analysis::ReachabilityAnalysis;
//! use bdd_reach::bdd::Bdd;
//! use bdd_reach::graph::GraphBuilder;
//! use bdd_reach::ingress::IngressLocation;
//! use bdd_reach::packet::BddPacket;
//! use bdd_reach::state::StateNode;
//! use bdd_reach::transition::Transition;
//!
//! let bdd = Arc::new(Bdd::default());
//! let packet = BddPacket::new(bdd.clone());
//! let ssh = packet.dst_port().value(&bdd, 22);
//!
//! // Two routers pointing a default route at each other; r2 accepts ssh.
//! let mut builder = GraphBuilder::new();
//! let r1 = StateNode::post_in_vrf("r1", "default");
//! let r2 = StateNode::post_in_vrf("r2", "default");
//! // Ingress points are registered explicitly; `connect` only interns states.
//! builder.ingress(StateNode::originate_vrf("r1", "default")).unwrap();
//! builder
//!     .connect(StateNode::originate_vrf("r1", "default"), r1.clone(), Transition::Identity)
//!     .unwrap();
//! builder.connect(r1.clone(), r2.clone(), Transition::Identity).unwrap();
//! builder.connect(r2.clone(), r1, Transition::constraint(-ssh)).unwrap();
//! builder.connect(r2, StateNode::Query, Transition::constraint(ssh)).unwrap();
//!
//! let analysis = ReachabilityAnalysis::new(bdd.clone(), builder.build().unwrap());
//! let r1_vrf = IngressLocation::vrf("r1", "default");
//! assert_eq!(analysis.reverse_reachable()[&r1_vrf], ssh);
//! assert_eq!(analysis.detect_loops()[&r1_vrf], -ssh);
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: the BDD manager, the predicate algebra everything runs on.
//! - **[`graph`]**: state nodes and edges, built once by a [`GraphBuilder`][crate::graph::GraphBuilder].
//! - **[`fixpoint`]**: forward and backward propagation to a fixpoint.
//! - **[`loops`]**: loop detection strategies.
//! - **[`analysis`]**: the public entry point.

pub mod analysis;
pub mod bdd;
pub mod cache;
pub mod config;
pub mod dot;
pub mod error;
pub mod fixpoint;
pub mod graph;
pub mod ingress;
pub mod loops;
pub mod observer;
pub mod packet;
pub mod reference;
pub mod sat;
pub mod state;
pub mod table;
pub mod transition;
pub mod utils;
