use batch_runner::{DefaultContext, StringLineParser, WordCountTask, execute};

use crate::fixture_path;

#[test]
fn counts_words() {
    let report = execute(
        fixture_path("words.txt"),
        &StringLineParser,
        &WordCountTask,
        &DefaultContext,
        2,
        1,
    )
    .unwrap();

    assert_eq!(report.counter("HELLO"), Some(2));
    assert_eq!(report.counter("WORLD"), Some(1));
    assert_eq!(report.counters.len(), 2);
}

#[test]
fn punctuation_and_case_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("text.txt");
    std::fs::write(&input, "The cat, the hat.\n\n  THE END!  \n-- --\n").unwrap();

    let report = execute(&input, &StringLineParser, &WordCountTask, &DefaultContext, 3, 2).unwrap();

    assert_eq!(report.counter("THE"), Some(3));
    assert_eq!(report.counter("CAT"), Some(1));
    assert_eq!(report.counter("HAT"), Some(1));
    assert_eq!(report.counter("END"), Some(1));
    assert_eq!(report.counters.len(), 4);
}
