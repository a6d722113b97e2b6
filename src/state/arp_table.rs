//! Address-resolution tracking for spoof detection
//!
//! At most one hardware address is recorded per protocol address
//! (last-write-wins). The mismatch check and the overwrite happen under
//! one entry lock, so two concurrent spoofed replies cannot both observe
//! a stale "no prior mapping".

use std::net::IpAddr;
use std::time::Instant;

use dashmap::DashMap;

use crate::core::packet::MacAddr;

use super::EvictionPolicy;

/// Outcome of recording one ARP reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpObservation {
    /// First time this protocol address was seen; mapping established,
    /// nothing to compare against.
    First,
    /// Same hardware address as recorded.
    Unchanged,
    /// Hardware address changed; the previous mapping is returned and the
    /// table now holds the new one.
    Changed { previous: MacAddr },
}

#[derive(Debug, Clone, Copy)]
struct ArpEntry {
    mac: MacAddr,
    last_seen: Instant,
}

/// Bounded IP -> MAC table
#[derive(Debug)]
pub struct ArpTable {
    map: DashMap<IpAddr, ArpEntry>,
    policy: EvictionPolicy,
}

impl ArpTable {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            map: DashMap::new(),
            policy,
        }
    }

    /// Record an observed sender mapping and report how it relates to the
    /// previous one. Compare-then-overwrite is atomic per address.
    pub fn observe(&self, ip: IpAddr, mac: MacAddr) -> ArpObservation {
        let now = Instant::now();
        match self.map.entry(ip) {
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(ArpEntry { mac, last_seen: now });
                ArpObservation::First
            }
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                let previous = slot.get().mac;
                slot.insert(ArpEntry { mac, last_seen: now });
                if previous == mac {
                    ArpObservation::Unchanged
                } else {
                    ArpObservation::Changed { previous }
                }
            }
        }
    }

    /// Currently recorded hardware address for a protocol address
    pub fn get(&self, ip: &IpAddr) -> Option<MacAddr> {
        self.map.get(ip).map(|e| e.mac)
    }

    /// Apply the eviction policy; returns the number of removed entries
    pub fn evict(&self) -> usize {
        let before = self.map.len();
        match self.policy {
            EvictionPolicy::Unbounded => return 0,
            EvictionPolicy::IdleTimeout { idle_secs } => {
                let idle = std::time::Duration::from_secs(idle_secs);
                self.map.retain(|_, entry| entry.last_seen.elapsed() < idle);
            }
            EvictionPolicy::MaxEntries { max } => {
                let excess = before.saturating_sub(max);
                if excess > 0 {
                    let mut by_age: Vec<(IpAddr, Instant)> = self
                        .map
                        .iter()
                        .map(|r| (*r.key(), r.value().last_seen))
                        .collect();
                    by_age.sort_by_key(|(_, seen)| *seen);
                    for (ip, _) in by_age.into_iter().take(excess) {
                        self.map.remove(&ip);
                    }
                }
            }
        }
        before - self.map.len()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&self) {
        self.map.clear();
    }
}

impl Default for ArpTable {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}
