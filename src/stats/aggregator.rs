//! Named numeric sample sets with on-demand derived metrics.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Derived metrics of an aggregator, computed from one consistent snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub mode: i64,
    pub min: i64,
    pub max: i64,
}

/// Stores every submitted sample in insertion order together with the running min, max and sum.
///
/// All operations take the per-aggregator lock, so readers always observe a consistent state.
/// The sorted view backing `median` and `mode` is cached until the next `add`.
#[derive(Debug, Default)]
pub struct Aggregator {
    state: Mutex<AggregatorState>,
}

#[derive(Debug, Default)]
struct AggregatorState {
    values: Vec<i64>,
    sorted: Option<Vec<i64>>,
    min: Option<i64>,
    max: Option<i64>,
    sum: i128,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, value: i64) {
        let mut state = self.lock();
        state.min = Some(state.min.map_or(value, |min| min.min(value)));
        state.max = Some(state.max.map_or(value, |max| max.max(value)));
        state.sum += i128::from(value);
        state.values.push(value);
        state.sorted = None;
    }

    pub fn count(&self) -> usize {
        self.lock().values.len()
    }

    pub fn sum(&self) -> i128 {
        self.lock().sum
    }

    /// Arithmetic mean; `0` when no sample was added.
    pub fn mean(&self) -> f64 {
        self.lock().mean()
    }

    /// Middle element of the sorted samples, averaging the two middle ones for an even count; `0`
    /// when empty.
    pub fn median(&self) -> f64 {
        self.lock().median()
    }

    /// Most frequent sample. Ties go to the smallest tied value; `0` when empty.
    pub fn mode(&self) -> i64 {
        self.lock().mode()
    }

    pub fn min(&self) -> Option<i64> {
        self.lock().min
    }

    pub fn max(&self) -> Option<i64> {
        self.lock().max
    }

    /// Samples in insertion order.
    pub fn values(&self) -> Vec<i64> {
        self.lock().values.clone()
    }

    /// All derived metrics at once, or `None` for an empty aggregator.
    pub fn summary(&self) -> Option<AggregateSummary> {
        let mut state = self.lock();
        let (min, max) = (state.min?, state.max?);
        Some(AggregateSummary {
            count: state.values.len(),
            mean: state.mean(),
            median: state.median(),
            mode: state.mode(),
            min,
            max,
        })
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // a panicking task cannot leave the state half-updated: `add` has no early exits
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AggregatorState {
    fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum as f64 / self.values.len() as f64
    }

    fn median(&mut self) -> f64 {
        let sorted = self.sorted();
        let len = sorted.len();
        if len == 0 {
            return 0.0;
        }

        let middle = (len - 1) / 2;
        if len % 2 == 0 {
            (sorted[middle] as f64 + sorted[middle + 1] as f64) / 2.0
        } else {
            sorted[middle] as f64
        }
    }

    fn mode(&mut self) -> i64 {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        let mut mode = (0, 0usize);

        for &value in self.sorted() {
            let count = counts.entry(value).or_default();
            *count += 1;
            if *count > mode.1 {
                mode = (value, *count);
            }
        }
        mode.0
    }

    fn sorted(&mut self) -> &[i64] {
        let values = &self.values;
        self.sorted.get_or_insert_with(|| {
            let mut sorted = values.clone();
            sorted.sort_unstable();
            sorted
        })
    }
}
