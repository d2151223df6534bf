//! Module focusing on the way batches are produced from the input and orchestrated between
//! worker threads.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info};

use crate::Error;
use crate::config::RunnerSettings;
use crate::files::{FileWriterRegistry, OUTPUT_DIR};
use crate::input::{LineParser, LineReader};
use crate::output::{LogStatisticsOutputWriter, StatisticsOutputWriter};
use crate::stats::{AggregateSummary, StatsRegistry};
use crate::task::{RunScope, Task};

mod container;


pub use container::{Batch, BatchContainer, BatchOutcome, BatchStatus};

/// A progress line (and a counter snapshot) is logged every this many completed batches.
pub const PROGRESS_INTERVAL: u64 = 100;

/// Executes a task over an input file: batches are read on the calling thread, dispatched in input
/// order to a fixed pool of `num_threads` workers, and never more than `num_threads` of them are in
/// flight.
///
/// The runner owns the run's statistics and output files. Both are emptied at the end of every run;
/// their final state is handed back in the [`RunReport`].
pub struct TaskRunner {
    num_threads: usize,
    batch_size: usize,
    skip_size: usize,
    process_size: Option<usize>,
    skip_malformed: bool,
    log_writer: LogStatisticsOutputWriter,
    alternate_writer: Option<Box<dyn StatisticsOutputWriter>>,
    stats: StatsRegistry,
    files: FileWriterRegistry,
}

impl std::fmt::Debug for TaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("num_threads", &self.num_threads)
            .field("batch_size", &self.batch_size)
            .field("skip_size", &self.skip_size)
            .field("process_size", &self.process_size)
            .field("skip_malformed", &self.skip_malformed)
            .field("alternate_writer", &self.alternate_writer.is_some())
            .finish_non_exhaustive()
    }
}

impl TaskRunner {
    pub fn new(num_threads: usize, batch_size: usize) -> Result<Self, Error> {
        if num_threads == 0 {
            return Err(Error::InvalidRunner("at least one worker thread is required".into()));
        }
        if batch_size == 0 {
            return Err(Error::InvalidRunner("batch size must be greater than zero".into()));
        }

        Ok(Self {
            num_threads,
            batch_size,
            skip_size: 0,
            process_size: None,
            skip_malformed: false,
            log_writer: LogStatisticsOutputWriter,
            alternate_writer: None,
            stats: StatsRegistry::new(),
            files: FileWriterRegistry::new(OUTPUT_DIR),
        })
    }

    pub fn from_settings(settings: &RunnerSettings) -> Result<Self, Error> {
        Ok(Self::new(settings.num_threads, settings.batch_size)?
            .with_skip_size(settings.skip_size)
            .with_process_size(settings.process_size)
            .with_skip_malformed(settings.skip_malformed))
    }

    /// Number of leading input lines to discard.
    pub fn with_skip_size(mut self, skip_size: usize) -> Self {
        self.skip_size = skip_size;
        self
    }

    /// Maximum number of records to consume from the input; `None` consumes everything.
    pub fn with_process_size(mut self, process_size: Option<usize>) -> Self {
        self.process_size = process_size;
        self
    }

    pub fn with_skip_malformed(mut self, skip_malformed: bool) -> Self {
        self.skip_malformed = skip_malformed;
        self
    }

    /// Writer invoked after the log writer when the statistics are emitted.
    pub fn with_alternate_writer(mut self, writer: impl StatisticsOutputWriter + 'static) -> Self {
        self.alternate_writer = Some(Box::new(writer));
        self
    }

    /// Directory for statistics files and task output files, `output-files` by default.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.files = FileWriterRegistry::new(dir);
        self
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn output_dir(&self) -> &Path {
        self.files.dir()
    }

    /// Runs `task` over every record of the file at `input`.
    ///
    /// Only failing to open the input is an error. Failed batches and reader failures mid-run are
    /// logged and reported in the [`RunReport`]; `post_execute` and the statistics writers run
    /// regardless.
    pub fn execute_task<T, P>(
        &mut self,
        input: impl AsRef<Path>,
        parser: &P,
        task: &T,
        context: &T::Context,
    ) -> Result<RunReport, Error>
    where
        T: Task,
        P: LineParser<Record = T::Record> + ?Sized,
    {
        let reader = LineReader::open(input, parser, self.skip_size)?;
        Ok(self.run(reader, task, context))
    }

    /// Same as [`TaskRunner::execute_task`], reading from an already opened source.
    pub fn execute_reader<T, P, R>(
        &mut self,
        source: R,
        parser: &P,
        task: &T,
        context: &T::Context,
    ) -> Result<RunReport, Error>
    where
        T: Task,
        P: LineParser<Record = T::Record> + ?Sized,
        R: BufRead,
    {
        let reader = LineReader::new(source, parser, self.skip_size)?;
        Ok(self.run(reader, task, context))
    }

    fn run<T, P, R>(
        &self,
        reader: LineReader<'_, P, R>,
        task: &T,
        context: &T::Context,
    ) -> RunReport
    where
        T: Task,
        P: LineParser<Record = T::Record> + ?Sized,
        R: BufRead,
    {
        let started = Instant::now();
        let scope = RunScope::new(context, &self.stats, &self.files);
        let mut reader = reader.skip_malformed(self.skip_malformed);
        let mut tally = Tally::default();

        info!(
            threads = self.num_threads,
            batch_size = self.batch_size,
            "Executing batches for task {}",
            task.name()
        );

        let producer_error = thread::scope(|s| {
            // in-flight batches never exceed the pool size, so sending never blocks
            let (job_tx, job_rx) = crossbeam_channel::bounded::<Batch<T::Record>>(self.num_threads);
            let (done_tx, done_rx) = crossbeam_channel::unbounded::<BatchOutcome>();

            for worker in 0..self.num_threads {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                s.spawn(move || {
                    for batch in job_rx {
                        let outcome = BatchContainer::new(batch, scope, task).call();
                        if done_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                    debug!(worker, "worker finished");
                });
            }

            // Workers hold their own clones
            drop(job_rx);
            drop(done_tx);

            let producer_error = self.produce(&mut reader, &job_tx, &done_rx, &mut tally);
            reader.close();

            // Signal EOF: workers drain the queue and exit
            drop(job_tx);

            while tally.in_flight > 0 {
                if !self.process_batch_result(&done_rx, &mut tally) {
                    break;
                }
            }
            producer_error
        });

        let elapsed = started.elapsed();
        match &producer_error {
            Some(e) => error!(error = %e, "Failed to execute task"),
            None => info!("Finished batches for task {}", task.name()),
        }
        info!("TOTAL TIME:\t{}ms", elapsed.as_millis());

        task.post_execute(&scope);
        self.emit(&self.log_writer);
        if let Some(writer) = &self.alternate_writer {
            self.emit(writer.as_ref());
        }

        let report = RunReport {
            batches_submitted: tally.submitted,
            batches_completed: tally.completed,
            batches_failed: tally.failed,
            records_read: tally.records_read,
            elapsed,
            counters: self.stats.counters().into_iter().collect(),
            aggregates: self
                .stats
                .aggregators()
                .into_iter()
                .filter_map(|(name, aggregator)| Some((name, aggregator.summary()?)))
                .collect(),
            producer_error,
        };

        self.stats.clear();
        self.files.close_all();
        report
    }

    // Reads and submits batches until the input is exhausted or fails, draining a completion
    // whenever the pool is full. Returns the reader failure, if any.
    fn produce<I, P, R>(
        &self,
        reader: &mut LineReader<'_, P, R>,
        job_tx: &Sender<Batch<I>>,
        done_rx: &Receiver<BatchOutcome>,
        tally: &mut Tally,
    ) -> Option<Error>
    where
        P: LineParser<Record = I> + ?Sized,
        R: BufRead,
    {
        loop {
            let (records, read_error) = self.next_batch(reader, &mut tally.records_read);
            let exhausted = records.is_empty();

            if !exhausted {
                let batch = Batch::new(tally.submitted, records);
                // Send fails only if every worker is gone; draining notices that.
                if job_tx.send(batch).is_ok() {
                    tally.submitted += 1;
                    tally.in_flight += 1;
                }
                if tally.in_flight == self.num_threads
                    && !self.process_batch_result(done_rx, tally)
                {
                    return Some(Error::InvalidRunner(
                        "the worker pool stopped unexpectedly".into(),
                    ));
                }
            }

            if read_error.is_some() {
                return read_error;
            }
            if exhausted {
                return None;
            }
        }
    }

    fn next_batch<I>(
        &self,
        reader: &mut impl Iterator<Item = Result<I, Error>>,
        records_read: &mut usize,
    ) -> (Vec<I>, Option<Error>) {
        let mut records = Vec::with_capacity(self.batch_size);

        while records.len() < self.batch_size
            && self.process_size.is_none_or(|limit| *records_read < limit)
        {
            match reader.next() {
                Some(Ok(record)) => {
                    records.push(record);
                    *records_read += 1;
                }
                Some(Err(e)) => return (records, Some(e)),
                None => break,
            }
        }
        (records, None)
    }

    // Waits for one batch to complete. Returns false if no completion can arrive anymore.
    fn process_batch_result(&self, done_rx: &Receiver<BatchOutcome>, tally: &mut Tally) -> bool {
        let Ok(outcome) = done_rx.recv() else {
            error!(in_flight = tally.in_flight, "worker pool stopped before all batches completed");
            tally.in_flight = 0;
            return false;
        };

        tally.in_flight -= 1;
        tally.completed += 1;

        match &outcome.status {
            BatchStatus::Succeeded => {}
            BatchStatus::Failed => {
                tally.failed += 1;
                error!(batch = outcome.seq, records = outcome.records, "Task failed");
            }
            BatchStatus::Errored(message) => {
                tally.failed += 1;
                error!(batch = outcome.seq, error = %message, "An error occurred executing task");
            }
            BatchStatus::Panicked(message) => {
                tally.failed += 1;
                error!(batch = outcome.seq, panic = %message, "Task panicked");
            }
        }

        if tally.completed % PROGRESS_INTERVAL == 0 {
            info!("Batches complete {}", tally.completed);
            self.emit_counters(&self.log_writer);
        }
        true
    }

    fn emit(&self, writer: &dyn StatisticsOutputWriter) {
        self.emit_counters(writer);
        if let Err(e) = writer.output_aggregators(&self.stats, &self.files) {
            error!(error = %e, "Unable to write aggregators");
        }
    }

    fn emit_counters(&self, writer: &dyn StatisticsOutputWriter) {
        if let Err(e) = writer.output_counters(&self.stats, &self.files) {
            error!(error = %e, "Unable to write counters");
        }
    }
}

#[derive(Debug, Default)]
struct Tally {
    submitted: u64,
    completed: u64,
    failed: u64,
    in_flight: usize,
    records_read: usize,
}

/// Summary of one run, including the statistics as they were right before they were cleared.
#[derive(Debug)]
pub struct RunReport {
    pub batches_submitted: u64,
    pub batches_completed: u64,
    /// Batches whose task returned `false`, an error, or panicked
    pub batches_failed: u64,
    pub records_read: usize,
    pub elapsed: Duration,
    pub counters: BTreeMap<String, i64>,
    pub aggregates: BTreeMap<String, AggregateSummary>,
    /// Set when reading the input failed part way through
    pub producer_error: Option<Error>,
}

impl RunReport {
    pub fn counter(&self, name: &str) -> Option<i64> {
        self.counters.get(name).copied()
    }

    pub fn aggregate(&self, name: &str) -> Option<&AggregateSummary> {
        self.aggregates.get(name)
    }
}
