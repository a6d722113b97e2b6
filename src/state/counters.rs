//! Per-source threshold counters
//!
//! Keys compose the source address with the attack name (and destination
//! port where a rule distinguishes targets), so one attack's flood never
//! advances another attack's counter. Counts are monotonically
//! non-decreasing between resets; a reset sets zero, never negative.

use std::net::IpAddr;
use std::time::Instant;

use dashmap::DashMap;

use super::EvictionPolicy;

/// Counter key: source address + attack name + optional destination port
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterKey {
    pub src_ip: IpAddr,
    pub attack: &'static str,
    pub dst_port: Option<u16>,
}

impl CounterKey {
    pub fn new(src_ip: IpAddr, attack: &'static str) -> Self {
        Self { src_ip, attack, dst_port: None }
    }

    pub fn with_port(src_ip: IpAddr, attack: &'static str, dst_port: u16) -> Self {
        Self { src_ip, attack, dst_port: Some(dst_port) }
    }
}

#[derive(Debug)]
struct CounterEntry {
    count: u64,
    last_seen: Instant,
}

/// Bounded per-key counter store with atomic increment-and-read
#[derive(Debug)]
pub struct CounterStore {
    map: DashMap<CounterKey, CounterEntry>,
    policy: EvictionPolicy,
}

impl CounterStore {
    pub fn new(policy: EvictionPolicy) -> Self {
        Self {
            map: DashMap::new(),
            policy,
        }
    }

    /// Increment the key and return the new count. Atomic per key: the
    /// entry stays locked from lookup through write.
    pub fn increment(&self, key: CounterKey) -> u64 {
        let mut entry = self.map.entry(key).or_insert_with(|| CounterEntry {
            count: 0,
            last_seen: Instant::now(),
        });
        entry.count += 1;
        entry.last_seen = Instant::now();
        entry.count
    }

    /// Current count, 0 when the key has never been seen
    pub fn get(&self, key: &CounterKey) -> u64 {
        self.map.get(key).map(|e| e.count).unwrap_or(0)
    }

    /// Reset the key to zero (edge-trigger semantics after an alert)
    pub fn reset(&self, key: &CounterKey) {
        if let Some(mut entry) = self.map.get_mut(key) {
            entry.count = 0;
            entry.last_seen = Instant::now();
        }
    }

    /// Apply the eviction policy; returns the number of removed keys.
    /// Called from the housekeeping tick, never from signature logic.
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
                    let mut by_age: Vec<(CounterKey, Instant)> = self
                        .map
                        .iter()
                        .map(|r| (r.key().clone(), r.value().last_seen))
                        .collect();
                    by_age.sort_by_key(|(_, seen)| *seen);
                    for (key, _) in by_age.into_iter().take(excess) {
                        self.map.remove(&key);
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

impl Default for CounterStore {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}
