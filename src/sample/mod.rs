//! Demonstration tasks available through the built-in catalog.

use crate::input::PairIntegerCsvLineParser;
use crate::task::{DefaultContext, RunScope, Task};


/// Counts the words of each line, one counter per sanitized (upper-cased, alphanumeric-only) word.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordCountTask;

impl WordCountTask {
    fn sanitize(token: &str) -> String {
        token
            .trim()
            .to_uppercase()
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect()
    }
}

impl Task for WordCountTask {
    type Record = String;
    type Context = DefaultContext;

    fn execute_task(
        &self,
        batch: &[String],
        scope: &RunScope<'_, DefaultContext>,
    ) -> anyhow::Result<bool> {
        for line in batch {
            for token in line.split_whitespace() {
                let word = Self::sanitize(token);
                if !word.is_empty() {
                    scope.stats().increment(&word);
                }
            }
        }
        Ok(true)
    }
}

/// Counts and sums integer records and aggregates their distribution.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumberAggregatorTask;

impl NumberAggregatorTask {
    pub const NUM_VALUES: &'static str = "NUM_VALUES";
    pub const SUM_VALUES: &'static str = "SUM_VALUES";
    pub const VALUE: &'static str = "VALUE";
}

impl Task for NumberAggregatorTask {
    type Record = i64;
    type Context = DefaultContext;

    fn execute_task(
        &self,
        batch: &[i64],
        scope: &RunScope<'_, DefaultContext>,
    ) -> anyhow::Result<bool> {
        let stats = scope.stats();
        for &value in batch {
            stats.increment(Self::NUM_VALUES);
            stats.add_delta(Self::SUM_VALUES, value);
            stats.aggregate(Self::VALUE, value);
        }
        Ok(true)
    }
}

/// Aggregates both sides of integer pairs, counting the malformed-line sentinels separately.
#[derive(Debug, Default, Clone, Copy)]
pub struct PairAggregatorTask;

impl PairAggregatorTask {
    pub const PAIRS: &'static str = "PAIRS";
    pub const MALFORMED_PAIRS: &'static str = "MALFORMED_PAIRS";
    pub const LEFT: &'static str = "LEFT";
    pub const RIGHT: &'static str = "RIGHT";
}

impl Task for PairAggregatorTask {
    type Record = (i32, i32);
    type Context = DefaultContext;

    fn execute_task(
        &self,
        batch: &[(i32, i32)],
        scope: &RunScope<'_, DefaultContext>,
    ) -> anyhow::Result<bool> {
        let stats = scope.stats();
        for &pair in batch {
            if pair == PairIntegerCsvLineParser::MALFORMED {
                stats.increment(Self::MALFORMED_PAIRS);
                continue;
            }
            stats.increment(Self::PAIRS);
            stats.aggregate(Self::LEFT, i64::from(pair.0));
            stats.aggregate(Self::RIGHT, i64::from(pair.1));
        }
        Ok(true)
    }
}
