//! Decoded packet representation
//!
//! The capture collaborator decodes raw frames into `PacketRecord`s; this
//! crate never touches raw bytes. Records are immutable once constructed.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Protocols the detection rules distinguish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
    Icmp,
    Arp,
    Other(u8),
}

impl From<u8> for Protocol {
    fn from(val: u8) -> Self {
        match val {
            1 => Protocol::Icmp,
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            other => Protocol::Other(other),
        }
    }
}

impl Protocol {
    /// IANA protocol number (ARP has no IP protocol number; 0 by convention)
    pub fn number(&self) -> u8 {
        match self {
            Protocol::Icmp => 1,
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Arp => 0,
            Protocol::Other(n) => *n,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Icmp => write!(f, "ICMP"),
            Protocol::Arp => write!(f, "ARP"),
            Protocol::Other(n) => write!(f, "Proto({})", n),
        }
    }
}

/// TCP flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
    pub ece: bool,
    pub cwr: bool,
}

impl TcpFlags {
    pub fn from_u8(flags: u8) -> Self {
        Self {
            fin: flags & 0x01 != 0,
            syn: flags & 0x02 != 0,
            rst: flags & 0x04 != 0,
            psh: flags & 0x08 != 0,
            ack: flags & 0x10 != 0,
            urg: flags & 0x20 != 0,
            ece: flags & 0x40 != 0,
            cwr: flags & 0x80 != 0,
        }
    }

    pub fn to_u8(&self) -> u8 {
        let mut flags = 0u8;
        if self.fin { flags |= 0x01; }
        if self.syn { flags |= 0x02; }
        if self.rst { flags |= 0x04; }
        if self.psh { flags |= 0x08; }
        if self.ack { flags |= 0x10; }
        if self.urg { flags |= 0x20; }
        if self.ece { flags |= 0x40; }
        if self.cwr { flags |= 0x80; }
        flags
    }

    /// SYN set with ACK clear (connection-open probe)
    pub fn is_syn_only(&self) -> bool {
        self.syn && !self.ack
    }

    pub fn syn_only() -> Self {
        Self { syn: true, ..Default::default() }
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        if self.syn { s.push('S'); }
        if self.ack { s.push('A'); }
        if self.fin { s.push('F'); }
        if self.rst { s.push('R'); }
        if self.psh { s.push('P'); }
        if self.urg { s.push('U'); }
        if s.is_empty() { s.push('.'); }
        write!(f, "{}", s)
    }
}

/// Hardware (MAC) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(|| format!("bad MAC: {}", s))?;
            *byte = u8::from_str_radix(part, 16).map_err(|_| format!("bad MAC: {}", s))?;
        }
        if parts.next().is_some() {
            return Err(format!("bad MAC: {}", s));
        }
        Ok(MacAddr(bytes))
    }
}

/// ARP operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArpOp {
    Request,
    Reply,
    Other(u16),
}

impl From<u16> for ArpOp {
    fn from(val: u16) -> Self {
        match val {
            1 => ArpOp::Request,
            2 => ArpOp::Reply,
            other => ArpOp::Other(other),
        }
    }
}

/// ARP header fields relevant to spoof detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArpInfo {
    pub op: ArpOp,
    pub sender_ip: IpAddr,
    pub sender_mac: MacAddr,
    pub target_ip: IpAddr,
    pub target_mac: MacAddr,
}

/// One decoded packet, as delivered by the capture collaborator
///
/// Fields the decoder could not produce are `None`; the feature extractor
/// and signature rules apply defaults rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketRecord {
    pub protocol: Protocol,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    #[serde(default)]
    pub dst_port: Option<u16>,
    #[serde(default)]
    pub tcp_flags: Option<TcpFlags>,
    #[serde(default)]
    pub payload_len: u32,
    /// ICMP type field (8 = echo request)
    #[serde(default)]
    pub icmp_type: Option<u8>,
    #[serde(default)]
    pub arp: Option<ArpInfo>,
}

impl PacketRecord {
    /// TCP packet with the given flags
    pub fn tcp(src_ip: IpAddr, dst_ip: IpAddr, dst_port: u16, flags: TcpFlags) -> Self {
        Self {
            protocol: Protocol::Tcp,
            src_ip,
            dst_ip,
            dst_port: Some(dst_port),
            tcp_flags: Some(flags),
            payload_len: 0,
            icmp_type: None,
            arp: None,
        }
    }

    /// UDP packet
    pub fn udp(src_ip: IpAddr, dst_ip: IpAddr, dst_port: u16) -> Self {
        Self {
            protocol: Protocol::Udp,
            src_ip,
            dst_ip,
            dst_port: Some(dst_port),
            tcp_flags: None,
            payload_len: 0,
            icmp_type: None,
            arp: None,
        }
    }

    /// ICMP packet of the given type
    pub fn icmp(src_ip: IpAddr, dst_ip: IpAddr, icmp_type: u8) -> Self {
        Self {
            protocol: Protocol::Icmp,
            src_ip,
            dst_ip,
            dst_port: None,
            tcp_flags: None,
            payload_len: 0,
            icmp_type: Some(icmp_type),
            arp: None,
        }
    }

    /// ARP reply claiming `sender_ip` is at `sender_mac`
    pub fn arp_reply(sender_ip: IpAddr, sender_mac: MacAddr, target_ip: IpAddr) -> Self {
        Self {
            protocol: Protocol::Arp,
            src_ip: sender_ip,
            dst_ip: target_ip,
            dst_port: None,
            tcp_flags: None,
            payload_len: 0,
            icmp_type: None,
            arp: Some(ArpInfo {
                op: ArpOp::Reply,
                sender_ip,
                sender_mac,
                target_ip,
                target_mac: MacAddr([0; 6]),
            }),
        }
    }

    pub fn with_payload_len(mut self, len: u32) -> Self {
        self.payload_len = len;
        self
    }

    /// One-line free-text summary for the detection log
    pub fn summary(&self) -> String {
        match (self.dst_port, self.tcp_flags) {
            (Some(port), Some(flags)) => format!(
                "{} {} -> {}:{} [{}] len={}",
                self.protocol, self.src_ip, self.dst_ip, port, flags, self.payload_len
            ),
            (Some(port), None) => format!(
                "{} {} -> {}:{} len={}",
                self.protocol, self.src_ip, self.dst_ip, port, self.payload_len
            ),
            _ => {
                if let Some(arp) = &self.arp {
                    format!(
                        "ARP {:?} {} is-at {}",
                        arp.op, arp.sender_ip, arp.sender_mac
                    )
                } else {
                    format!(
                        "{} {} -> {} len={}",
                        self.protocol, self.src_ip, self.dst_ip, self.payload_len
                    )
                }
            }
        }
    }
}
