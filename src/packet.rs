//! Packet-header layout over BDD variables.
//!
//! A [`BddPacket`] assigns a contiguous block of BDD variables to each header field,
//! most significant bit first, so that prefixes and exact values become short cubes.

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::bdd::Bdd;
use crate::reference::Ref;

/// A header field encoded as consecutive BDD variables, most significant bit first.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BitVec {
    name: &'static str,
    first_var: u32,
    width: u32,
}

impl BitVec {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// BDD variables of this field, most significant first.
    pub fn vars(&self) -> Vec<u32> {
        (self.first_var..self.first_var + self.width).collect()
    }

    /// Headers whose field equals `value`.
    pub fn value(&self, bdd: &Bdd, value: u64) -> Ref {
        self.prefix(bdd, value, self.width)
    }

    /// Headers whose `len` most significant field bits match those of `value`.
    pub fn prefix(&self, bdd: &Bdd, value: u64, len: u32) -> Ref {
        assert!(len <= self.width, "prefix /{} is longer than field {}", len, self.name);
        assert!(
            self.width == 64 || value >> self.width == 0,
            "value {} does not fit into {} bits of field {}",
            value,
            self.width,
            self.name
        );

        let literals = (0..len).map(|i| {
            let bit = (value >> (self.width - 1 - i)) & 1 == 1;
            let var = (self.first_var + i) as i32;
            if bit {
                var
            } else {
                -var
            }
        });
        bdd.mk_cube(literals)
    }
}

/// The header fields the reachability model reasons about.
#[derive(Debug, Clone)]
pub struct BddPacket {
    bdd: Arc<Bdd>,
    dst_ip: BitVec,
    src_ip: BitVec,
    dst_port: BitVec,
    src_port: BitVec,
    ip_protocol: BitVec,
}

impl BddPacket {
    pub const IP_BITS: u32 = 32;
    pub const PORT_BITS: u32 = 16;
    pub const PROTOCOL_BITS: u32 = 8;

    pub fn new(bdd: Arc<Bdd>) -> Self {
        let mut next_var = 1;
        let mut field = |name, width| {
            let field = BitVec {
                name,
                first_var: next_var,
                width,
            };
            next_var += width;
            field
        };

        let dst_ip = field("dstIp", Self::IP_BITS);
        let src_ip = field("srcIp", Self::IP_BITS);
        let dst_port = field("dstPort", Self::PORT_BITS);
        let src_port = field("srcPort", Self::PORT_BITS);
        let ip_protocol = field("ipProtocol", Self::PROTOCOL_BITS);

        Self {
            bdd,
            dst_ip,
            src_ip,
            dst_port,
            src_port,
            ip_protocol,
        }
    }

    pub fn bdd(&self) -> &Arc<Bdd> {
        &self.bdd
    }

    /// Total number of header variables.
    pub fn num_vars(&self) -> usize {
        (2 * Self::IP_BITS + 2 * Self::PORT_BITS + Self::PROTOCOL_BITS) as usize
    }

    pub fn dst_ip(&self) -> &BitVec {
        &self.dst_ip
    }
    pub fn src_ip(&self) -> &BitVec {
        &self.src_ip
    }
    pub fn dst_port(&self) -> &BitVec {
        &self.dst_port
    }
    pub fn src_port(&self) -> &BitVec {
        &self.src_port
    }
    pub fn ip_protocol(&self) -> &BitVec {
        &self.ip_protocol
    }

    /// Headers destined to `addr/len`.
    pub fn dst_prefix(&self, addr: Ipv4Addr, len: u32) -> Ref {
        self.dst_ip.prefix(&self.bdd, u32::from(addr) as u64, len)
    }

    /// Headers sourced from `addr/len`.
    pub fn src_prefix(&self, addr: Ipv4Addr, len: u32) -> Ref {
        self.src_ip.prefix(&self.bdd, u32::from(addr) as u64, len)
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;

    use super::*;

    #[test]
    fn test_fields_are_disjoint() {
        let packet = BddPacket::new(Arc::new(Bdd::default()));

        let mut all: Vec<u32> = [
            packet.dst_ip(),
            packet.src_ip(),
            packet.dst_port(),
            packet.src_port(),
            packet.ip_protocol(),
        ]
        .iter()
        .flat_map(|f| f.vars())
        .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
        assert_eq!(total, packet.num_vars());
        assert_eq!(all.first(), Some(&1));
    }

    #[test]
    fn test_prefix_counts() {
        let packet = BddPacket::new(Arc::new(Bdd::default()));
        let bdd = packet.bdd().clone();

        let net = packet.dst_prefix(Ipv4Addr::new(10, 0, 0, 0), 8);
        let host = packet.dst_prefix(Ipv4Addr::new(10, 1, 2, 3), 32);
        assert!(bdd.is_implies(host, net));
        assert!(!bdd.is_implies(net, host));

        let dst_only = bdd.exists(net, &packet.src_ip().vars());
        assert_eq!(dst_only, net);

        // Restricted to the destination field alone: 2^24 addresses.
        let count = bdd.sat_count(net, 32);
        assert_eq!(count, BigUint::from(1u64 << 24));
    }

    #[test]
    fn test_value_is_exact() {
        let packet = BddPacket::new(Arc::new(Bdd::default()));
        let bdd = packet.bdd().clone();

        let ssh = packet.dst_port().value(&bdd, 22);
        let http = packet.dst_port().value(&bdd, 80);
        assert!(bdd.is_zero(bdd.apply_and(ssh, http)));
        assert_eq!(packet.ip_protocol().value(&bdd, 6), packet.ip_protocol().prefix(&bdd, 6, 8));
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_value_out_of_range() {
        let packet = BddPacket::new(Arc::new(Bdd::default()));
        packet.ip_protocol().value(packet.bdd(), 300);
    }
}
