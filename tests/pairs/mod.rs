use batch_runner::{DefaultContext, PairAggregatorTask, PairIntegerCsvLineParser, execute};

use crate::fixture_path;

#[test]
fn malformed_pairs_are_counted_separately() {
    let report = execute(
        fixture_path("pairs.csv"),
        &PairIntegerCsvLineParser,
        &PairAggregatorTask,
        &DefaultContext,
        2,
        2,
    )
    .unwrap();

    assert_eq!(report.counter(PairAggregatorTask::PAIRS), Some(3));
    assert_eq!(report.counter(PairAggregatorTask::MALFORMED_PAIRS), Some(2));

    let left = report.aggregate(PairAggregatorTask::LEFT).unwrap();
    assert_eq!((left.min, left.max, left.mean), (1, 3, 2.0));
    let right = report.aggregate(PairAggregatorTask::RIGHT).unwrap();
    assert_eq!((right.min, right.max, right.median), (10, 30, 20.0));
}
