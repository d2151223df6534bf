use tracing::info;

use crate::Error;
use crate::files::FileWriterRegistry;
use crate::output::{StatisticsOutputWriter, truncate_decimal};
use crate::stats::StatsRegistry;

const PRINT_PADDING: usize = 30;
const RULE: &str = "========================================================";

/// Writes the statistics as a table to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatisticsOutputWriter;

impl LogStatisticsOutputWriter {
    /// The counter table, or nothing when there are no counters.
    pub fn counter_lines(&self, stats: &StatsRegistry) -> Vec<String> {
        let counters = stats.counters();
        if counters.is_empty() {
            return Vec::new();
        }

        let mut lines = vec![RULE.to_string(), "Counters".to_string(), RULE.to_string()];
        lines.extend(
            counters
                .iter()
                .map(|(name, value)| metric_line(name, value)),
        );
        lines.push(RULE.to_string());
        lines
    }

    /// One block per aggregator, or nothing when there are no aggregators.
    pub fn aggregator_lines(&self, stats: &StatsRegistry) -> Vec<String> {
        let aggregators = stats.aggregators();
        if aggregators.is_empty() {
            return Vec::new();
        }

        let mut lines = vec![RULE.to_string(), "Aggregates".to_string(), RULE.to_string()];
        for (name, aggregator) in &aggregators {
            let Some(summary) = aggregator.summary() else {
                continue;
            };
            lines.push(format!("--{name}"));
            lines.push(metric_line("MEAN", truncate_decimal(summary.mean)));
            lines.push(metric_line("MEDIAN", truncate_decimal(summary.median)));
            lines.push(metric_line("MODE", summary.mode));
            lines.push(metric_line("MIN", summary.min));
            lines.push(metric_line("MAX", summary.max));
        }
        lines.push(RULE.to_string());
        lines
    }
}

impl StatisticsOutputWriter for LogStatisticsOutputWriter {
    fn output_counters(
        &self,
        stats: &StatsRegistry,
        _files: &FileWriterRegistry,
    ) -> Result<(), Error> {
        let lines = self.counter_lines(stats);
        if lines.is_empty() {
            info!(target: "batch_runner::stats", "No counters found");
        }
        for line in lines {
            info!(target: "batch_runner::stats", "{line}");
        }
        Ok(())
    }

    fn output_aggregators(
        &self,
        stats: &StatsRegistry,
        _files: &FileWriterRegistry,
    ) -> Result<(), Error> {
        let lines = self.aggregator_lines(stats);
        if lines.is_empty() {
            info!(target: "batch_runner::stats", "No aggregators found");
        }
        for line in lines {
            info!(target: "batch_runner::stats", "{line}");
        }
        Ok(())
    }
}

/// `name:` padded to the print width, a tab, then the value.
pub(crate) fn metric_line(name: &str, value: impl std::fmt::Display) -> String {
    let label = format!("{name}:");
    format!("{label:<width$}\t{value}", width = PRINT_PADDING + 1)
}
