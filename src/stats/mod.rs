//! Module holding the statistics shared by all workers of a run: named counters and named
//! aggregators.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

mod aggregator;


pub use aggregator::{AggregateSummary, Aggregator};

/// Concurrent registry of counters and aggregators.
///
/// Entries are created on first use. Concurrent first use of the same name yields exactly one
/// entry. Counter updates are lock-free; aggregator updates lock only the affected aggregator.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    counters: DashMap<String, AtomicI64>,
    aggregators: DashMap<String, Arc<Aggregator>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, name: &str) {
        self.add_delta(name, 1);
    }

    /// Adds `delta` to the counter `name`. Deltas are expected to be non-negative.
    pub fn add_delta(&self, name: &str, delta: i64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(delta, Ordering::Relaxed);
            return;
        }
        self.counters
            .entry(name.to_string())
            .or_default()
            .fetch_add(delta, Ordering::Relaxed);
    }

    pub fn counter(&self, name: &str) -> Option<i64> {
        self.counters
            .get(name)
            .map(|counter| counter.load(Ordering::Relaxed))
    }

    /// Snapshot of all counters, sorted by name.
    pub fn counters(&self) -> Vec<(String, i64)> {
        let mut counters: Vec<_> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        counters.sort_by(|a, b| a.0.cmp(&b.0));
        counters
    }

    /// Adds `value` as a sample of the aggregator `name`.
    pub fn aggregate(&self, name: &str, value: i64) {
        self.aggregator_entry(name).add(value);
    }

    pub fn aggregator(&self, name: &str) -> Option<Arc<Aggregator>> {
        self.aggregators.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of all aggregators, sorted by name.
    pub fn aggregators(&self) -> Vec<(String, Arc<Aggregator>)> {
        let mut aggregators: Vec<_> = self
            .aggregators
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        aggregators.sort_by(|a, b| a.0.cmp(&b.0));
        aggregators
    }

    pub fn clear_counters(&self) {
        self.counters.clear();
    }

    pub fn clear_aggregators(&self) {
        self.aggregators.clear();
    }

    pub fn clear(&self) {
        self.clear_counters();
        self.clear_aggregators();
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty() && self.aggregators.is_empty()
    }

    // The shard guard is released before the aggregator lock is taken.
    fn aggregator_entry(&self, name: &str) -> Arc<Aggregator> {
        if let Some(existing) = self.aggregators.get(name) {
            return Arc::clone(existing.value());
        }
        Arc::clone(self.aggregators.entry(name.to_string()).or_default().value())
    }
}
