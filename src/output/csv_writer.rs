use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::Error;
use crate::files::{FileWriterRegistry, TaskFileWriter};
use crate::output::{StatisticsOutputWriter, truncate_decimal};
use crate::stats::StatsRegistry;

const TIMESTAMP_FORMAT: &str = "%d%m%Y-%H%M%S";

/// Writes the statistics to `<timestamp>.counters.csv` and `<timestamp>.aggregators.csv` in the
/// output directory. Nothing is created when there is nothing to write.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvStatisticsOutputWriter;

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct CounterRow<'a> {
    counter_name: &'a str,
    counter_value: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct AggregatorRow<'a> {
    aggregator_name: &'a str,
    mean: String,
    median: String,
    mode: i64,
    min: i64,
    max: i64,
}

impl CsvStatisticsOutputWriter {
    fn file_name(kind: &str) -> String {
        format!("{}.{kind}.csv", Local::now().format(TIMESTAMP_FORMAT))
    }

    fn write_rows<T: Serialize>(
        file: &TaskFileWriter,
        rows: impl IntoIterator<Item = T>,
    ) -> Result<(), Error> {
        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush().map_err(|e| crate::error::io_error(file.path(), e))?;
        drop(writer);
        file.close()
    }
}

impl StatisticsOutputWriter for CsvStatisticsOutputWriter {
    fn output_counters(
        &self,
        stats: &StatsRegistry,
        files: &FileWriterRegistry,
    ) -> Result<(), Error> {
        let counters = stats.counters();
        if counters.is_empty() {
            warn!("No counters found, no counters.csv will be created.");
            return Ok(());
        }

        let file = files.get(&Self::file_name("counters"), false)?;
        Self::write_rows(
            &file,
            counters.iter().map(|(name, value)| CounterRow {
                counter_name: name,
                counter_value: *value,
            }),
        )?;
        info!(path = %file.path().display(), rows = counters.len(), "wrote counters");
        Ok(())
    }

    fn output_aggregators(
        &self,
        stats: &StatsRegistry,
        files: &FileWriterRegistry,
    ) -> Result<(), Error> {
        let aggregators = stats.aggregators();
        if aggregators.is_empty() {
            warn!("No aggregators found, no aggregators.csv will be created.");
            return Ok(());
        }

        let file = files.get(&Self::file_name("aggregators"), false)?;
        let rows = aggregators.iter().filter_map(|(name, aggregator)| {
            let summary = aggregator.summary()?;
            Some(AggregatorRow {
                aggregator_name: name,
                mean: truncate_decimal(summary.mean),
                median: truncate_decimal(summary.median),
                mode: summary.mode,
                min: summary.min,
                max: summary.max,
            })
        });
        Self::write_rows(&file, rows)?;
        info!(path = %file.path().display(), rows = aggregators.len(), "wrote aggregators");
        Ok(())
    }
}
