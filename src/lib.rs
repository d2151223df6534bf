mod app;
mod catalog;
mod config;
mod error;
mod files;
mod input;
mod output;
mod runner;
mod sample;
mod stats;
mod task;
mod telemetry;

pub use app::{AppOptions, Outcome, prompt_user, resolve_properties, run, run_with_io};
pub use catalog::{Catalog, Job, PreparedJob};
pub use config::{
    DEFAULT_CONFIG_PATH, Properties, REQUIRED_PROPERTIES, RUNNER_INPUT_FILE,
    RUNNER_INPUT_PROCESS_SIZE, RUNNER_INPUT_SKIP_MALFORMED, RUNNER_INPUT_SKIP_SIZE,
    RUNNER_PARSER_CLASS, RUNNER_TASK_BATCH_SIZE, RUNNER_TASK_CLASS, RUNNER_TASK_THREADS,
    RunnerSettings,
};
pub use error::Error;
pub use files::{FileWriterRegistry, OUTPUT_DIR, TaskFileWriter};
pub use input::{
    IntegerLineParser, LineParser, LineReader, PairIntegerCsvLineParser, StringLineParser,
};
pub use output::{
    CsvStatisticsOutputWriter, LogStatisticsOutputWriter, StatisticsOutputWriter, truncate_decimal,
};
pub use runner::{
    Batch, BatchContainer, BatchOutcome, BatchStatus, PROGRESS_INTERVAL, RunReport, TaskRunner,
};
pub use sample::{NumberAggregatorTask, PairAggregatorTask, WordCountTask};
pub use stats::{AggregateSummary, Aggregator, StatsRegistry};
pub use task::{Context, DefaultContext, RunScope, Task};
pub use telemetry::setup_logging;

/// Runs `task` over every line of the file at `input` with the given parallelism and returns the
/// run summary.
///
/// This is the shortest way to drive the harness from code. Records are produced by `parser` on the
/// calling thread and handed to `num_threads` workers in batches of `batch_size`; the statistics
/// gathered by the task are logged once all batches completed and returned in the [`RunReport`].
///
/// # Example
///
/// ```no_run
/// use batch_runner::{DefaultContext, IntegerLineParser, NumberAggregatorTask, execute};
///
/// let report = execute(
///     "numbers.txt",
///     &IntegerLineParser,
///     &NumberAggregatorTask,
///     &DefaultContext,
///     4,
///     1000,
/// )?;
/// println!("sum = {:?}", report.counter("SUM_VALUES"));
/// # Ok::<(), batch_runner::Error>(())
/// ```
pub fn execute<T, P>(
    input: impl AsRef<std::path::Path>,
    parser: &P,
    task: &T,
    context: &T::Context,
    num_threads: usize,
    batch_size: usize,
) -> Result<RunReport, Error>
where
    T: Task,
    P: LineParser<Record = T::Record> + ?Sized,
{
    TaskRunner::new(num_threads, batch_size)?.execute_task(input, parser, task, context)
}
