//! Signature Rule Set
//!
//! A static registry of named attack signatures evaluated per packet.
//! Rules are loaded once at startup and read-only for the process
//! lifetime; all mutable state lives in the counter store and ARP table
//! passed into `evaluate`.
//!
//! Rule kinds:
//! - stateless: pure predicate on packet fields
//! - threshold: per-(source, attack) counter, edge-triggered with
//!   reset-on-trigger
//! - ARP table: hardware-address change for a known protocol address
//! - DNS provenance: response traffic not from the trusted resolver

pub mod registry;

use std::net::IpAddr;

use tracing::debug;

use crate::core::packet::{ArpOp, PacketRecord, Protocol};
use crate::state::{ArpObservation, ArpTable, CounterKey, CounterStore};

pub use registry::default_signatures;

/// How a signature decides, beyond its packet filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    /// Fires on every matching packet
    Stateless,
    /// Fires when the per-(source, attack) counter strictly exceeds the
    /// threshold, then resets it to zero. Edge-triggered: sustained traffic
    /// below a fresh threshold does not re-fire.
    Threshold { threshold: u64 },
    /// Fires when an ARP reply changes a recorded IP -> MAC mapping
    ArpReplyMismatch,
    /// Fires when DNS-port traffic does not originate from the trusted
    /// resolver
    DnsProvenance,
}

impl SignatureKind {
    /// Short human-readable form for the CLI listing
    pub fn describe(&self) -> String {
        match self {
            Self::Stateless => "stateless".to_string(),
            Self::Threshold { threshold } => format!("threshold > {}", threshold),
            Self::ArpReplyMismatch => "arp table".to_string(),
            Self::DnsProvenance => "dns provenance".to_string(),
        }
    }
}

/// One named attack signature
#[derive(Debug, Clone)]
pub struct AttackSignature {
    /// Unique name, used as the counter-key component and in log records
    pub name: &'static str,
    pub protocol: Protocol,
    /// Destination-port filter, where the attack targets a service
    pub dst_port: Option<u16>,
    /// Require the SYN-only flag pattern
    pub syn_only: bool,
    /// Minimum payload length (oversized-packet rules)
    pub min_payload_len: Option<u32>,
    /// ICMP type filter
    pub icmp_type: Option<u8>,
    pub kind: SignatureKind,
}

impl AttackSignature {
    /// Stateless field filters; threshold/table state is checked separately
    fn matches(&self, packet: &PacketRecord) -> bool {
        if packet.protocol != self.protocol {
            return false;
        }
        if let Some(port) = self.dst_port {
            if packet.dst_port != Some(port) {
                return false;
            }
        }
        if self.syn_only && !packet.tcp_flags.map(|f| f.is_syn_only()).unwrap_or(false) {
            return false;
        }
        if let Some(min) = self.min_payload_len {
            if packet.payload_len < min {
                return false;
            }
        }
        if let Some(icmp_type) = self.icmp_type {
            if packet.icmp_type != Some(icmp_type) {
                return false;
            }
        }
        true
    }

    fn counter_key(&self, src_ip: IpAddr) -> CounterKey {
        match self.dst_port {
            Some(port) => CounterKey::with_port(src_ip, self.name, port),
            None => CounterKey::new(src_ip, self.name),
        }
    }
}

/// The loaded, immutable rule registry
#[derive(Debug)]
pub struct SignatureSet {
    rules: Vec<AttackSignature>,
    trusted_resolver: IpAddr,
}

impl SignatureSet {
    pub fn new(rules: Vec<AttackSignature>, trusted_resolver: IpAddr) -> Self {
        Self {
            rules,
            trusted_resolver,
        }
    }

    pub fn rules(&self) -> &[AttackSignature] {
        &self.rules
    }

    /// Evaluate every rule against one packet. Returns all triggered
    /// signature names in registry order, not just the first.
    pub fn evaluate(
        &self,
        packet: &PacketRecord,
        counters: &CounterStore,
        arp_table: &ArpTable,
    ) -> Vec<String> {
        let mut triggered = Vec::new();

        for rule in &self.rules {
            let fired = match rule.kind {
                SignatureKind::Stateless => rule.matches(packet),
                SignatureKind::Threshold { threshold } => {
                    if rule.matches(packet) {
                        let key = rule.counter_key(packet.src_ip);
                        let count = counters.increment(key.clone());
                        if count > threshold {
                            counters.reset(&key);
                            true
                        } else {
                            false
                        }
                    } else {
                        false
                    }
                }
                SignatureKind::ArpReplyMismatch => self.check_arp(packet, arp_table),
                SignatureKind::DnsProvenance => {
                    rule.matches(packet) && packet.src_ip != self.trusted_resolver
                }
            };

            if fired {
                debug!(signature = rule.name, src = %packet.src_ip, "signature triggered");
                triggered.push(rule.name.to_string());
            }
        }

        triggered
    }

    /// ARP reply handling: the mismatch check happens before the table
    /// entry is overwritten (both inside one atomic observe). First-ever
    /// observations establish the trusted mapping and never fire.
    fn check_arp(&self, packet: &PacketRecord, arp_table: &ArpTable) -> bool {
        let Some(arp) = &packet.arp else {
            return false;
        };
        if arp.op != ArpOp::Reply {
            return false;
        }
        matches!(
            arp_table.observe(arp.sender_ip, arp.sender_mac),
            ArpObservation::Changed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignatureConfig;
    use crate::core::packet::{MacAddr, TcpFlags};
    use std::net::Ipv4Addr;

    fn set() -> SignatureSet {
        default_signatures(&SignatureConfig::default())
    }

    fn src() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))
    }

    fn dst() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
    }

    #[test]
    fn test_ping_of_death_stateless() {
        let set = set();
        let counters = CounterStore::default();
        let arp = ArpTable::default();

        let oversized = PacketRecord::icmp(src(), dst(), 8).with_payload_len(65535);
        assert_eq!(set.evaluate(&oversized, &counters, &arp), vec!["Ping-of-Death"]);

        let normal = PacketRecord::icmp(src(), dst(), 8).with_payload_len(64);
        assert!(set.evaluate(&normal, &counters, &arp).is_empty());

        // Echo reply (type 0) never matches, regardless of size
        let reply = PacketRecord::icmp(src(), dst(), 0).with_payload_len(65535);
        assert!(set.evaluate(&reply, &counters, &arp).is_empty());
    }

    #[test]
    fn test_syn_flood_requires_syn_only() {
        let set = set();
        let counters = CounterStore::default();
        let arp = ArpTable::default();

        let syn = PacketRecord::tcp(src(), dst(), 443, TcpFlags::syn_only());
        assert!(set
            .evaluate(&syn, &counters, &arp)
            .contains(&"SYN-Flood".to_string()));

        let syn_ack = PacketRecord::tcp(src(), dst(), 443, TcpFlags::from_u8(0x12));
        assert!(set.evaluate(&syn_ack, &counters, &arp).is_empty());
    }

    #[test]
    fn test_udp_flood_edge_triggered() {
        let set = set();
        let counters = CounterStore::default();
        let arp = ArpTable::default();
        let packet = PacketRecord::udp(src(), dst(), 9999);

        // Packets 1..=100 stay silent, the 101st fires and resets
        for i in 1..=100 {
            assert!(
                set.evaluate(&packet, &counters, &arp).is_empty(),
                "packet {} fired early",
                i
            );
        }
        assert_eq!(set.evaluate(&packet, &counters, &arp), vec!["UDP-Flood"]);

        // After the reset, 100 more are needed before the next trigger
        for i in 1..=100 {
            assert!(
                set.evaluate(&packet, &counters, &arp).is_empty(),
                "packet {} after reset fired early",
                i
            );
        }
        assert_eq!(set.evaluate(&packet, &counters, &arp), vec!["UDP-Flood"]);
    }

    #[test]
    fn test_flood_counters_do_not_cross_sources() {
        let set = set();
        let counters = CounterStore::default();
        let arp = ArpTable::default();

        let a = PacketRecord::udp(src(), dst(), 9999);
        let b = PacketRecord::udp(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 6)), dst(), 9999);

        for _ in 0..100 {
            set.evaluate(&a, &counters, &arp);
        }
        // Source B is still at zero
        assert!(set.evaluate(&b, &counters, &arp).is_empty());
        // Source A fires on its own next packet
        assert_eq!(set.evaluate(&a, &counters, &arp), vec!["UDP-Flood"]);
    }

    #[test]
    fn test_slowloris_and_http_flood_share_packet_not_counter() {
        let set = set();
        let counters = CounterStore::default();
        let arp = ArpTable::default();

        // SYN-only to port 80 matches both HTTP-Flood (threshold 200) and
        // Slowloris (threshold 50); Slowloris fires first at packet 51.
        let packet = PacketRecord::tcp(src(), dst(), 80, TcpFlags::syn_only());
        let mut slowloris_hits = 0;
        for _ in 0..51 {
            let names = set.evaluate(&packet, &counters, &arp);
            slowloris_hits += names.iter().filter(|n| *n == "Slowloris").count();
            assert!(!names.contains(&"HTTP-Flood".to_string()));
        }
        assert_eq!(slowloris_hits, 1);
    }

    #[test]
    fn test_brute_force_thresholds() {
        let set = set();
        let counters = CounterStore::default();
        let arp = ArpTable::default();

        let ssh = PacketRecord::tcp(src(), dst(), 22, TcpFlags::from_u8(0x18));
        for _ in 0..10 {
            assert!(!set
                .evaluate(&ssh, &counters, &arp)
                .contains(&"SSH-Brute-Force".to_string()));
        }
        assert!(set
            .evaluate(&ssh, &counters, &arp)
            .contains(&"SSH-Brute-Force".to_string()));
    }

    #[test]
    fn test_arp_spoofing_sequence() {
        let set = set();
        let counters = CounterStore::default();
        let arp = ArpTable::default();

        let mac1 = MacAddr([0xaa, 0, 0, 0, 0, 1]);
        let mac2 = MacAddr([0xaa, 0, 0, 0, 0, 2]);

        // First observation establishes the baseline
        let first = PacketRecord::arp_reply(src(), mac1, dst());
        assert!(set.evaluate(&first, &counters, &arp).is_empty());

        // Changed MAC fires exactly once
        let spoofed = PacketRecord::arp_reply(src(), mac2, dst());
        assert_eq!(set.evaluate(&spoofed, &counters, &arp), vec!["ARP-Spoofing"]);

        // Repeating the new MAC is now the recorded mapping
        assert!(set.evaluate(&spoofed, &counters, &arp).is_empty());
    }

    #[test]
    fn test_dns_provenance() {
        let set = set();
        let counters = CounterStore::default();
        let arp = ArpTable::default();

        let resolver = SignatureConfig::default().trusted_resolver;
        let from_resolver = PacketRecord::udp(resolver, dst(), 53);
        assert!(set.evaluate(&from_resolver, &counters, &arp).is_empty());

        let spoofed = PacketRecord::udp(src(), dst(), 53);
        assert!(set
            .evaluate(&spoofed, &counters, &arp)
            .contains(&"DNS-Spoofing".to_string()));
    }

    #[test]
    fn test_multiple_signatures_same_packet() {
        let set = set();
        let counters = CounterStore::default();
        let arp = ArpTable::default();

        // SYN-only to port 22 is both a SYN-Flood candidate and, past the
        // threshold, an SSH brute-force hit.
        let packet = PacketRecord::tcp(src(), dst(), 22, TcpFlags::syn_only());
        for _ in 0..10 {
            set.evaluate(&packet, &counters, &arp);
        }
        let names = set.evaluate(&packet, &counters, &arp);
        assert!(names.contains(&"SYN-Flood".to_string()));
        assert!(names.contains(&"SSH-Brute-Force".to_string()));
    }
}
