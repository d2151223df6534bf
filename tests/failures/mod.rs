//! Tests for runs in which tasks, the input or the configuration go wrong.

use std::sync::atomic::{AtomicUsize, Ordering};

use batch_runner::{
    AppOptions, Catalog, Context, DefaultContext, Error, IntegerLineParser, Outcome, Properties,
    RunScope, Task, TaskRunner, run_with_io,
};

use crate::fixture_path;

/// Refuses every other batch it is given.
#[derive(Default)]
struct AlternatingTask {
    calls: AtomicUsize,
}

impl Task for AlternatingTask {
    type Record = i64;
    type Context = DefaultContext;

    fn execute_task(
        &self,
        batch: &[i64],
        scope: &RunScope<'_, DefaultContext>,
    ) -> anyhow::Result<bool> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            return Ok(false);
        }
        scope.stats().add_delta("SEEN", batch.len() as i64);
        Ok(true)
    }
}

#[test]
fn refused_batches_are_soft_failures() {
    let mut runner = TaskRunner::new(2, 1).unwrap();

    let report = runner
        .execute_task(
            fixture_path("numbers.txt"),
            &IntegerLineParser,
            &AlternatingTask::default(),
            &DefaultContext,
        )
        .unwrap();

    assert_eq!(report.batches_completed, 5);
    assert_eq!(report.batches_failed, 2);
    assert_eq!(report.counter("SEEN"), Some(3));
    assert!(report.producer_error.is_none());
}

#[test]
fn unparseable_line_ends_the_run_early() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("numbers.txt");
    std::fs::write(&input, "1\n2\nthree\n4\n").unwrap();
    let mut runner = TaskRunner::new(1, 1).unwrap();

    let report = runner
        .execute_task(&input, &IntegerLineParser, &AlternatingTask::default(), &DefaultContext)
        .unwrap();

    assert!(matches!(report.producer_error, Some(Error::Parse { line: 3, .. })));
    assert_eq!(report.batches_completed, 2);
}

struct LimitContext {
    limit: i64,
}

impl Context for LimitContext {
    fn init(properties: &Properties) -> anyhow::Result<Self> {
        let limit = properties.get("limit").unwrap_or("0").parse()?;
        if limit < 0 {
            anyhow::bail!("limit must not be negative");
        }
        Ok(Self { limit })
    }

    fn required_property_names() -> &'static [&'static str] {
        &["limit"]
    }
}

#[derive(Default)]
struct BelowLimitTask;

impl Task for BelowLimitTask {
    type Record = i64;
    type Context = LimitContext;

    fn execute_task(
        &self,
        batch: &[i64],
        scope: &RunScope<'_, LimitContext>,
    ) -> anyhow::Result<bool> {
        let limit = scope.context().limit;
        let below = batch.iter().filter(|&&v| v < limit).count();
        scope.stats().add_delta("BELOW", below as i64);
        Ok(true)
    }
}

fn config(dir: &std::path::Path, extra: &str) -> AppOptions {
    let path = dir.join("runner.properties");
    let content = format!(
        "runner.task.class=below-limit\n\
         runner.parser.class=integer\n\
         runner.input.file={}\n\
         runner.task.threads=2\n\
         runner.task.batch.size=2\n\
         {extra}",
        fixture_path("numbers.txt").display()
    );
    std::fs::write(&path, content).unwrap();
    AppOptions {
        config_path: path,
        prompt: false,
        output_dir: Some(dir.join("output-files")),
        ..AppOptions::default()
    }
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::with_builtins();
    catalog.register_task::<BelowLimitTask>("below-limit");
    catalog
}

#[test]
fn registered_task_runs_with_its_context() {
    let dir = tempfile::tempdir().unwrap();
    let options = config(dir.path(), "limit=4\n");

    let outcome = run_with_io(&options, &catalog(), &mut "".as_bytes(), &mut Vec::new()).unwrap();

    let Outcome::Completed(report) = outcome else {
        panic!("expected the run to complete");
    };
    assert_eq!(report.counter("BELOW"), Some(3));
}

#[test]
fn context_rejecting_its_configuration_aborts_before_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let options = config(dir.path(), "limit=-1\n");

    let err = run_with_io(&options, &catalog(), &mut "".as_bytes(), &mut Vec::new()).unwrap_err();

    assert!(matches!(err, Error::ContextInit(_)));
    assert_eq!(err.exit_code(), -3);
}

#[test]
fn missing_context_property_aborts_before_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let options = config(dir.path(), "");

    let err = run_with_io(&options, &catalog(), &mut "".as_bytes(), &mut Vec::new()).unwrap_err();

    assert!(matches!(&err, Error::MissingProperty(key) if key == "limit"));
}
