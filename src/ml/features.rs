//! Feature extraction from packet records
//!
//! Produces the 41-value NSL-KDD-style vector the classifier was trained
//! on. Extraction is total: malformed or partial records encode through
//! defaults and sentinels, never through an error.

use serde::{Deserialize, Serialize};

use crate::core::packet::{PacketRecord, Protocol, TcpFlags};

/// Width of the training schema
pub const SCHEMA_WIDTH: usize = 41;

/// Positions 0..LIVE_FEATURE_COUNT are derivable from a live packet
pub const LIVE_FEATURE_COUNT: usize = 6;

/// Positions LIVE_FEATURE_COUNT..SCHEMA_WIDTH cover training-time aggregate
/// statistics unavailable at single-packet inference; they are filled with
/// this constant. A documented approximation, not a gap to silently fix.
pub const PLACEHOLDER_VALUE: f32 = 0.0;

/// Names of the live feature positions, in vector order
pub const LIVE_FEATURE_NAMES: &[&str] = &[
    "duration",
    "protocol_type",
    "service",
    "flag",
    "src_bytes",
    "dst_bytes",
];

/// Categorical code for values outside the protocol/flag training tables
const UNKNOWN_CATEGORY: f32 = -1.0;

/// Categorical code for services outside the training table
const SERVICE_OTHER: f32 = 99.0;

/// Extracted feature vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Stateless packet-to-vector encoder
///
/// The categorical tables below must match the training-time encoding
/// exactly; they are fixed, not configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Output width, checked against the classifier at startup
    pub fn output_width(&self) -> usize {
        SCHEMA_WIDTH
    }

    /// Encode a packet. Never fails: absent fields take defaults
    /// (no port -> service "other", no payload -> 0).
    pub fn extract(&self, packet: &PacketRecord) -> FeatureVector {
        let mut values = Vec::with_capacity(SCHEMA_WIDTH);

        values.push(0.0);                                   // duration
        values.push(encode_protocol(packet.protocol));      // protocol_type
        values.push(encode_service(packet.dst_port));       // service
        values.push(encode_flag_class(packet.tcp_flags));   // flag
        values.push(packet.payload_len as f32);             // src_bytes
        let dst_bytes = if packet.protocol == Protocol::Tcp {
            packet.payload_len as f32
        } else {
            0.0
        };
        values.push(dst_bytes);                             // dst_bytes

        values.resize(SCHEMA_WIDTH, PLACEHOLDER_VALUE);

        FeatureVector { values }
    }
}

/// Training-time protocol codes: TCP=0, UDP=1, ICMP=2
fn encode_protocol(protocol: Protocol) -> f32 {
    match protocol.number() {
        6 => 0.0,
        17 => 1.0,
        1 => 2.0,
        _ => UNKNOWN_CATEGORY,
    }
}

/// Training-time service codes, keyed by destination port
fn encode_service(dst_port: Option<u16>) -> f32 {
    match dst_port {
        Some(80) => 0.0,  // http
        Some(21) => 1.0,  // ftp
        Some(25) => 2.0,  // smtp
        Some(53) => 3.0,  // dns
        Some(22) => 4.0,  // ssh
        _ => SERVICE_OTHER,
    }
}

/// Training-time connection-state flag classes
///
/// Single-packet flag bits map onto a coarse subset of the classes the
/// trainer derived from whole connections; everything else is OTH.
fn encode_flag_class(flags: Option<TcpFlags>) -> f32 {
    let class = match flags.map(|f| f.to_u8()) {
        Some(0x04) => "RSTR",
        Some(0x02) => "S0",
        Some(0x10) => "S1",
        Some(0x18) => "SF",
        _ => "OTH",
    };
    match class {
        "OTH" => 0.0,
        "REJ" => 1.0,
        "RSTO" => 2.0,
        "RSTOS0" => 3.0,
        "RSTR" => 4.0,
        "S0" => 5.0,
        "S1" => 6.0,
        "S2" => 7.0,
        "S3" => 8.0,
        "SF" => 9.0,
        "SH" => 10.0,
        _ => UNKNOWN_CATEGORY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::packet::{MacAddr, PacketRecord, TcpFlags};
    use std::net::{IpAddr, Ipv4Addr};

    fn src() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))
    }

    fn dst() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
    }

    #[test]
    fn test_width_is_schema_width_for_all_shapes() {
        let extractor = FeatureExtractor::new();
        let packets = vec![
            PacketRecord::tcp(src(), dst(), 80, TcpFlags::syn_only()),
            PacketRecord::udp(src(), dst(), 53),
            PacketRecord::icmp(src(), dst(), 8).with_payload_len(65535),
            PacketRecord::arp_reply(src(), MacAddr([1; 6]), dst()),
            // Deliberately inconsistent: TCP with no port and no flags
            PacketRecord {
                protocol: crate::core::packet::Protocol::Tcp,
                src_ip: src(),
                dst_ip: dst(),
                dst_port: None,
                tcp_flags: None,
                payload_len: 0,
                icmp_type: None,
                arp: None,
            },
        ];

        for packet in &packets {
            let vector = extractor.extract(packet);
            assert_eq!(vector.len(), SCHEMA_WIDTH, "packet: {}", packet.summary());
        }
    }

    #[test]
    fn test_known_encodings() {
        let extractor = FeatureExtractor::new();

        let syn = PacketRecord::tcp(src(), dst(), 22, TcpFlags::syn_only()).with_payload_len(40);
        let v = extractor.extract(&syn);
        assert_eq!(v.as_slice()[1], 0.0); // TCP
        assert_eq!(v.as_slice()[2], 4.0); // ssh
        assert_eq!(v.as_slice()[3], 5.0); // S0 (SYN only)
        assert_eq!(v.as_slice()[4], 40.0);

        let dns = PacketRecord::udp(src(), dst(), 53);
        let v = extractor.extract(&dns);
        assert_eq!(v.as_slice()[1], 1.0); // UDP
        assert_eq!(v.as_slice()[2], 3.0); // dns
        assert_eq!(v.as_slice()[3], 0.0); // OTH (no TCP flags)
    }

    #[test]
    fn test_unknowns_map_to_sentinels_not_errors() {
        let extractor = FeatureExtractor::new();

        let arp = PacketRecord::arp_reply(src(), MacAddr([1; 6]), dst());
        let v = extractor.extract(&arp);
        assert_eq!(v.as_slice()[1], UNKNOWN_CATEGORY); // no trained protocol code
        assert_eq!(v.as_slice()[2], SERVICE_OTHER);    // no port

        let odd = PacketRecord::tcp(src(), dst(), 6667, TcpFlags::from_u8(0x3f));
        let v = extractor.extract(&odd);
        assert_eq!(v.as_slice()[2], SERVICE_OTHER);
        assert_eq!(v.as_slice()[3], 0.0); // unmapped flag combination -> OTH
    }

    #[test]
    fn test_placeholder_tail_is_constant() {
        let extractor = FeatureExtractor::new();
        let v = extractor.extract(&PacketRecord::udp(src(), dst(), 9999));
        for (i, value) in v.as_slice().iter().enumerate().skip(LIVE_FEATURE_COUNT) {
            assert_eq!(*value, PLACEHOLDER_VALUE, "position {}", i);
        }
        assert_eq!(LIVE_FEATURE_NAMES.len(), LIVE_FEATURE_COUNT);
    }
}
