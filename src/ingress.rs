//! Externally meaningful entry points and their projection from state nodes.

use std::fmt;

use crate::error::{ReachError, Result};
use crate::state::StateNode;

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum IngressLocation {
    Vrf { hostname: String, vrf: String },
    InterfaceLink { hostname: String, iface: String },
}

impl IngressLocation {
    pub fn vrf(hostname: impl Into<String>, vrf: impl Into<String>) -> Self {
        IngressLocation::Vrf {
            hostname: hostname.into(),
            vrf: vrf.into(),
        }
    }

    pub fn interface_link(hostname: impl Into<String>, iface: impl Into<String>) -> Self {
        IngressLocation::InterfaceLink {
            hostname: hostname.into(),
            iface: iface.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        match self {
            IngressLocation::Vrf { hostname, .. } | IngressLocation::InterfaceLink { hostname, .. } => hostname,
        }
    }
}

impl fmt::Display for IngressLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngressLocation::Vrf { hostname, vrf } => write!(f, "{}[vrf {}]", hostname, vrf),
            IngressLocation::InterfaceLink { hostname, iface } => write!(f, "{}[{}]", hostname, iface),
        }
    }
}

/// Project an ingress state onto its location. Fails on every other kind of state.
pub fn to_ingress_location(state: &StateNode) -> Result<IngressLocation> {
    match state {
        StateNode::OriginateVrf { hostname, vrf } => Ok(IngressLocation::vrf(hostname, vrf)),
        StateNode::OriginateInterfaceLink { hostname, iface } => Ok(IngressLocation::interface_link(hostname, iface)),
        other => Err(ReachError::NotIngress(other.clone())),
    }
}

impl TryFrom<&StateNode> for IngressLocation {
    type Error = ReachError;

    fn try_from(state: &StateNode) -> Result<Self> {
        to_ingress_location(state)
    }
}

impl From<&IngressLocation> for StateNode {
    fn from(location: &IngressLocation) -> Self {
        match location {
            IngressLocation::Vrf { hostname, vrf } => StateNode::originate_vrf(hostname, vrf),
            IngressLocation::InterfaceLink { hostname, iface } => StateNode::originate_interface_link(hostname, iface),
        }
    }
}
