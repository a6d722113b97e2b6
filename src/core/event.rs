//! Detection output records
//!
//! `DetectionRecord` is the unit the durable log stores, one JSON object
//! per line. Records are append-only; nothing in this crate mutates or
//! deletes a written record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::packet::PacketRecord;

/// Final per-packet verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Normal,
    Anomaly,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Normal => write!(f, "NORMAL"),
            Verdict::Anomaly => write!(f, "ANOMALY"),
        }
    }
}

/// One processed packet's outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRecord {
    /// Unique record ID
    pub id: Uuid,
    /// When the packet was processed
    pub timestamp: DateTime<Utc>,
    /// Final verdict
    pub verdict: Verdict,
    /// Every signature that triggered, in registry order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<String>,
    /// Classifier probability, absent when classification failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f32>,
    /// Free-text packet summary
    pub summary: String,
}

impl DetectionRecord {
    pub fn new(
        packet: &PacketRecord,
        verdict: Verdict,
        signatures: Vec<String>,
        probability: Option<f32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            verdict,
            signatures,
            probability,
            summary: packet.summary(),
        }
    }

    /// Whether this record must reach the durable log even when full
    /// audit-trail logging is off
    pub fn is_alert(&self) -> bool {
        self.verdict == Verdict::Anomaly
    }
}

/// Periodic rolling-window metrics, written to the observability sink
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub timestamp: DateTime<Utc>,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc: f64,
    /// Label pairs the window held when this summary was computed
    pub samples: usize,
}

impl MetricsSummary {
    pub fn new(precision: f64, recall: f64, f1: f64, auc: f64, samples: usize) -> Self {
        Self {
            timestamp: Utc::now(),
            precision,
            recall,
            f1,
            auc,
            samples,
        }
    }
}
