//! Default signature registry
//!
//! The nine built-in rules with their operator-tunable thresholds. Names
//! are stable keys: they appear in counter keys and detection records.

use crate::config::SignatureConfig;
use crate::core::packet::Protocol;

use super::{AttackSignature, SignatureKind, SignatureSet};

pub const PING_OF_DEATH: &str = "Ping-of-Death";
pub const SYN_FLOOD: &str = "SYN-Flood";
pub const UDP_FLOOD: &str = "UDP-Flood";
pub const HTTP_FLOOD: &str = "HTTP-Flood";
pub const SLOWLORIS: &str = "Slowloris";
pub const ARP_SPOOFING: &str = "ARP-Spoofing";
pub const DNS_SPOOFING: &str = "DNS-Spoofing";
pub const FTP_BRUTE_FORCE: &str = "FTP-Brute-Force";
pub const SSH_BRUTE_FORCE: &str = "SSH-Brute-Force";

const ICMP_ECHO_REQUEST: u8 = 8;
const DNS_PORT: u16 = 53;
const HTTP_PORT: u16 = 80;
const FTP_PORT: u16 = 21;
const SSH_PORT: u16 = 22;

/// Build the built-in rule set with the configured thresholds
pub fn default_signatures(config: &SignatureConfig) -> SignatureSet {
    let rules = vec![
        AttackSignature {
            name: PING_OF_DEATH,
            protocol: Protocol::Icmp,
            dst_port: None,
            syn_only: false,
            min_payload_len: Some(config.ping_of_death_payload),
            icmp_type: Some(ICMP_ECHO_REQUEST),
            kind: SignatureKind::Stateless,
        },
        AttackSignature {
            name: SYN_FLOOD,
            protocol: Protocol::Tcp,
            dst_port: None,
            syn_only: true,
            min_payload_len: None,
            icmp_type: None,
            kind: SignatureKind::Stateless,
        },
        AttackSignature {
            name: UDP_FLOOD,
            protocol: Protocol::Udp,
            dst_port: None,
            syn_only: false,
            min_payload_len: None,
            icmp_type: None,
            kind: SignatureKind::Threshold {
                threshold: config.udp_flood_threshold,
            },
        },
        AttackSignature {
            name: HTTP_FLOOD,
            protocol: Protocol::Tcp,
            dst_port: Some(HTTP_PORT),
            syn_only: false,
            min_payload_len: None,
            icmp_type: None,
            kind: SignatureKind::Threshold {
                threshold: config.http_flood_threshold,
            },
        },
        AttackSignature {
            name: SLOWLORIS,
            protocol: Protocol::Tcp,
            dst_port: Some(HTTP_PORT),
            syn_only: true,
            min_payload_len: None,
            icmp_type: None,
            kind: SignatureKind::Threshold {
                threshold: config.slowloris_threshold,
            },
        },
        AttackSignature {
            name: ARP_SPOOFING,
            protocol: Protocol::Arp,
            dst_port: None,
            syn_only: false,
            min_payload_len: None,
            icmp_type: None,
            kind: SignatureKind::ArpReplyMismatch,
        },
        AttackSignature {
            name: DNS_SPOOFING,
            protocol: Protocol::Udp,
            dst_port: Some(DNS_PORT),
            syn_only: false,
            min_payload_len: None,
            icmp_type: None,
            kind: SignatureKind::DnsProvenance,
        },
        AttackSignature {
            name: FTP_BRUTE_FORCE,
            protocol: Protocol::Tcp,
            dst_port: Some(FTP_PORT),
            syn_only: false,
            min_payload_len: None,
            icmp_type: None,
            kind: SignatureKind::Threshold {
                threshold: config.brute_force_threshold,
            },
        },
        AttackSignature {
            name: SSH_BRUTE_FORCE,
            protocol: Protocol::Tcp,
            dst_port: Some(SSH_PORT),
            syn_only: false,
            min_payload_len: None,
            icmp_type: None,
            kind: SignatureKind::Threshold {
                threshold: config.brute_force_threshold,
            },
        },
    ];

    SignatureSet::new(rules, config.trusted_resolver)
}
