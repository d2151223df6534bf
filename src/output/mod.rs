//! Module writing the accumulated statistics to their sinks once a run is over.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::Error;
use crate::files::FileWriterRegistry;
use crate::stats::StatsRegistry;

mod csv_writer;
mod log_writer;


pub use csv_writer::CsvStatisticsOutputWriter;
pub use log_writer::LogStatisticsOutputWriter;

/// A sink for the counters and aggregators of a run. Entries are emitted sorted by name.
pub trait StatisticsOutputWriter {
    fn output_counters(
        &self,
        stats: &StatsRegistry,
        files: &FileWriterRegistry,
    ) -> Result<(), Error>;

    fn output_aggregators(
        &self,
        stats: &StatsRegistry,
        files: &FileWriterRegistry,
    ) -> Result<(), Error>;
}

/// Renders `value` with at most two fractional digits (half-even rounding), dropping the fraction
/// entirely when it is zero: `3.0` becomes `3`, `2.456` becomes `2.46`.
pub fn truncate_decimal(value: f64) -> String {
    match Decimal::from_f64(value) {
        Some(decimal) => decimal.round_dp(2).normalize().to_string(),
        None => value.to_string(),
    }
}
