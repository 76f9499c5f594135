//! Points in the life of a packet.
//!
//! The reachability graph is built over these states. The engine only relies on
//! their identity; the taxonomy mirrors the phases a packet goes through on a device:
//!
//! ```text
//! PreInInterface -> PostInVrf -> PreOutVrf -> PreOutEdge -> PreOutEdgePostNat -> PreInInterface
//! ```

use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum StateNode {
    /// Packets originating from a VRF on a device.
    OriginateVrf { hostname: String, vrf: String },
    /// Packets entering the network over an interface link.
    OriginateInterfaceLink { hostname: String, iface: String },
    /// About to be received on an interface.
    PreInInterface { hostname: String, iface: String },
    /// Received, before the routing lookup in a VRF.
    PostInVrf { hostname: String, vrf: String },
    /// After the routing lookup, before choosing an egress interface.
    PreOutVrf { hostname: String, vrf: String },
    /// About to leave on an interface.
    PreOutEdge { hostname: String, iface: String },
    /// About to leave on an interface, after source NAT.
    PreOutEdgePostNat { hostname: String, iface: String },
    NodeAccept { hostname: String },
    NodeDropAcl { hostname: String },
    NodeDropNoRoute { hostname: String },
    /// The designated terminal state of the question being asked.
    Query,
}

impl StateNode {
    pub fn originate_vrf(hostname: impl Into<String>, vrf: impl Into<String>) -> Self {
        StateNode::OriginateVrf {
            hostname: hostname.into(),
            vrf: vrf.into(),
        }
    }

    pub fn originate_interface_link(hostname: impl Into<String>, iface: impl Into<String>) -> Self {
        StateNode::OriginateInterfaceLink {
            hostname: hostname.into(),
            iface: iface.into(),
        }
    }

    pub fn pre_in_interface(hostname: impl Into<String>, iface: impl Into<String>) -> Self {
        StateNode::PreInInterface {
            hostname: hostname.into(),
            iface: iface.into(),
        }
    }

    pub fn post_in_vrf(hostname: impl Into<String>, vrf: impl Into<String>) -> Self {
        StateNode::PostInVrf {
            hostname: hostname.into(),
            vrf: vrf.into(),
        }
    }

    pub fn pre_out_vrf(hostname: impl Into<String>, vrf: impl Into<String>) -> Self {
        StateNode::PreOutVrf {
            hostname: hostname.into(),
            vrf: vrf.into(),
        }
    }

    pub fn pre_out_edge(hostname: impl Into<String>, iface: impl Into<String>) -> Self {
        StateNode::PreOutEdge {
            hostname: hostname.into(),
            iface: iface.into(),
        }
    }

    pub fn pre_out_edge_post_nat(hostname: impl Into<String>, iface: impl Into<String>) -> Self {
        StateNode::PreOutEdgePostNat {
            hostname: hostname.into(),
            iface: iface.into(),
        }
    }

    pub fn node_accept(hostname: impl Into<String>) -> Self {
        StateNode::NodeAccept {
            hostname: hostname.into(),
        }
    }

    pub fn node_drop_acl(hostname: impl Into<String>) -> Self {
        StateNode::NodeDropAcl {
            hostname: hostname.into(),
        }
    }

    pub fn node_drop_no_route(hostname: impl Into<String>) -> Self {
        StateNode::NodeDropNoRoute {
            hostname: hostname.into(),
        }
    }

    /// Whether packets can be injected at this state.
    pub fn is_ingress(&self) -> bool {
        matches!(
            self,
            StateNode::OriginateVrf { .. } | StateNode::OriginateInterfaceLink { .. }
        )
    }

    pub fn hostname(&self) -> Option<&str> {
        match self {
            StateNode::OriginateVrf { hostname, .. }
            | StateNode::OriginateInterfaceLink { hostname, .. }
            | StateNode::PreInInterface { hostname, .. }
            | StateNode::PostInVrf { hostname, .. }
            | StateNode::PreOutVrf { hostname, .. }
            | StateNode::PreOutEdge { hostname, .. }
            | StateNode::PreOutEdgePostNat { hostname, .. }
            | StateNode::NodeAccept { hostname }
            | StateNode::NodeDropAcl { hostname }
            | StateNode::NodeDropNoRoute { hostname } => Some(hostname),
            StateNode::Query => None,
        }
    }
}

impl fmt::Display for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateNode::OriginateVrf { hostname, vrf } => write!(f, "OriginateVrf({}, {})", hostname, vrf),
            StateNode::OriginateInterfaceLink { hostname, iface } => {
                write!(f, "OriginateInterfaceLink({}, {})", hostname, iface)
            }
            StateNode::PreInInterface { hostname, iface } => write!(f, "PreInInterface({}, {})", hostname, iface),
            StateNode::PostInVrf { hostname, vrf } => write!(f, "PostInVrf({}, {})", hostname, vrf),
            StateNode::PreOutVrf { hostname, vrf } => write!(f, "PreOutVrf({}, {})", hostname, vrf),
            StateNode::PreOutEdge { hostname, iface } => write!(f, "PreOutEdge({}, {})", hostname, iface),
            StateNode::PreOutEdgePostNat { hostname, iface } => {
                write!(f, "PreOutEdgePostNat({}, {})", hostname, iface)
            }
            StateNode::NodeAccept { hostname } => write!(f, "NodeAccept({})", hostname),
            StateNode::NodeDropAcl { hostname } => write!(f, "NodeDropAcl({})", hostname),
            StateNode::NodeDropNoRoute { hostname } => write!(f, "NodeDropNoRoute({})", hostname),
            StateNode::Query => write!(f, "Query"),
        }
    }
}
