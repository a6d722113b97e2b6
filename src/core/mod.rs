//! Core shared types for packet records and detection output
//!
//! Provides the data structures exchanged between the capture collaborator,
//! the detection engine, and the alert sink:
//! - `PacketRecord`: decoded packet fields as delivered by capture
//! - `DetectionRecord`: one verdict per processed packet
//! - `MetricsSummary`: periodic rolling-window metrics

pub mod event;
pub mod packet;

pub use event::{DetectionRecord, MetricsSummary, Verdict};
pub use packet::{ArpInfo, ArpOp, MacAddr, PacketRecord, Protocol, TcpFlags};
