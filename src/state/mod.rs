//! Shared mutable detection state
//!
//! Both stores are explicitly owned objects handed to the per-packet path
//! and the housekeeping tick, never bare shared containers. Per-key
//! operations are atomic (dashmap entry API), and both stores are bounded
//! behind a swappable eviction policy.

pub mod arp_table;
pub mod counters;

use serde::{Deserialize, Serialize};

pub use arp_table::{ArpObservation, ArpTable};
pub use counters::{CounterKey, CounterStore};

/// Bound on per-source state growth
///
/// The policy lives outside the signature logic so it can be swapped and
/// tested in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum EvictionPolicy {
    /// Drop keys not touched for this long
    IdleTimeout { idle_secs: u64 },
    /// Drop least-recently-seen keys beyond this count
    MaxEntries { max: usize },
    /// No eviction; state grows with the number of distinct sources
    Unbounded,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        EvictionPolicy::IdleTimeout { idle_secs: 600 }
    }
}
