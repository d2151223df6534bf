use std::io::Write;

use batch_runner::{
    AggregateSummary, DefaultContext, IntegerLineParser, NumberAggregatorTask, TaskRunner, execute,
};
use rstest::rstest;

use crate::fixture_path;

#[rstest]
fn same_statistics_for_any_parallelism(
    #[values(1, 2, 8)] threads: usize,
    #[values(1, 2, 10)] batch_size: usize,
) {
    let report = execute(
        fixture_path("numbers.txt"),
        &IntegerLineParser,
        &NumberAggregatorTask,
        &DefaultContext,
        threads,
        batch_size,
    )
    .unwrap();

    assert_eq!(report.counter(NumberAggregatorTask::NUM_VALUES), Some(5));
    assert_eq!(report.counter(NumberAggregatorTask::SUM_VALUES), Some(15));
    assert_eq!(
        report.aggregate(NumberAggregatorTask::VALUE),
        Some(&AggregateSummary {
            count: 5,
            mean: 3.0,
            median: 3.0,
            mode: 1,
            min: 1,
            max: 5,
        })
    );
    assert_eq!(report.batches_submitted as usize, 5_usize.div_ceil(batch_size));
}

#[test]
fn skip_and_cap_select_a_window() {
    let mut runner = TaskRunner::new(2, 2)
        .unwrap()
        .with_skip_size(1)
        .with_process_size(Some(2));

    let report = runner
        .execute_task(
            fixture_path("numbers.txt"),
            &IntegerLineParser,
            &NumberAggregatorTask,
            &DefaultContext,
        )
        .unwrap();

    assert_eq!(report.counter(NumberAggregatorTask::NUM_VALUES), Some(2));
    assert_eq!(report.counter(NumberAggregatorTask::SUM_VALUES), Some(5));
}

#[test]
fn even_length_median() {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    writeln!(input, "40\n10\n30\n20").unwrap();

    let report = execute(
        input.path(),
        &IntegerLineParser,
        &NumberAggregatorTask,
        &DefaultContext,
        4,
        1,
    )
    .unwrap();

    let value = report.aggregate(NumberAggregatorTask::VALUE).unwrap();
    assert_eq!(value.median, 25.0);
    assert_eq!(value.mean, 25.0);
    assert_eq!((value.min, value.max, value.mode), (10, 40, 10));
}

#[test]
fn large_input_is_fully_counted() {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    for i in 1..=10_000 {
        writeln!(input, "{i}").unwrap();
    }
    input.flush().unwrap();

    let report = execute(
        input.path(),
        &IntegerLineParser,
        &NumberAggregatorTask,
        &DefaultContext,
        4,
        64,
    )
    .unwrap();

    assert_eq!(report.counter(NumberAggregatorTask::NUM_VALUES), Some(10_000));
    assert_eq!(report.counter(NumberAggregatorTask::SUM_VALUES), Some(50_005_000));
    assert_eq!(report.batches_completed, 157);
    assert_eq!(report.batches_failed, 0);
}
