//! Integration tests running the actual crate binary against configuration and input files: the
//! full E2E path.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::fixture_path;

/// Working directory holding a configuration file; `output-files/` is created inside it.
struct Workdir {
    dir: tempfile::TempDir,
}

impl Workdir {
    fn with_config(config: &str) -> Self {
        let dir = tempfile::tempdir().expect("failed to create working directory");
        std::fs::write(dir.path().join("runner.properties"), config)
            .expect("failed to write configuration");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_batch-runner"));
        command
            .current_dir(self.path())
            .env("RUST_LOG", "info")
            .args(["-c", "runner.properties"])
            .args(args);
        command
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command(args).output().expect("failed to execute binary")
    }

    /// Runs the binary with prompting enabled, answering `answer`.
    fn run_answering(&self, answer: &str) -> Output {
        let mut child = self
            .command(&[])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn binary");
        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(answer.as_bytes())
            .expect("failed to answer the prompt");
        child.wait_with_output().expect("failed to wait for binary")
    }

    fn output_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(self.path().join("output-files")) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries.map(|e| e.unwrap().path()).collect();
        files.sort();
        files
    }

    fn output_file(&self, suffix: &str) -> String {
        let path = self
            .output_files()
            .into_iter()
            .find(|p| p.to_string_lossy().ends_with(suffix))
            .unwrap_or_else(|| panic!("no output file ending in {suffix}"));
        std::fs::read_to_string(path).expect("failed to read output file")
    }
}

fn number_config(input: &str) -> String {
    format!(
        "# sums the numbers fixture\n\
         runner.task.class=number-aggregator\n\
         runner.parser.class=integer\n\
         runner.input.file={}\n\
         runner.task.threads=2\n\
         runner.task.batch.size=2\n",
        fixture_path(input).display()
    )
}

/// The exit status observed by the parent for a negative exit code.
fn status_of(code: i32) -> Option<i32> {
    Some(code & 0xff)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn csv_statistics_are_written() {
    let workdir = Workdir::with_config(&number_config("numbers.txt"));

    let output = workdir.run(&["-p", "false", "--csv"]);

    assert!(
        output.status.success(),
        "binary exited with non-zero status.\nstderr: {}",
        stderr(&output)
    );
    assert_eq!(workdir.output_files().len(), 2);
    assert_eq!(
        workdir.output_file(".counters.csv"),
        "COUNTER_NAME,COUNTER_VALUE\nNUM_VALUES,5\nSUM_VALUES,15\n"
    );
    assert_eq!(
        workdir.output_file(".aggregators.csv"),
        "AGGREGATOR_NAME,MEAN,MEDIAN,MODE,MIN,MAX\nVALUE,3,3,1,1,5\n"
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Starting Process with given parameters..."));
    assert!(stderr(&output).contains("Task took 0 minutes"));
}

#[test]
fn statistics_are_only_logged_without_csv_flag() {
    let workdir = Workdir::with_config(&number_config("numbers.txt"));

    let output = workdir.run(&["-p", "false"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(workdir.output_files().is_empty());
    assert!(stderr(&output).contains("NUM_VALUES:"));
}

#[test]
fn defines_override_the_configuration() {
    let workdir = Workdir::with_config(&number_config("numbers.txt"));

    let output = workdir.run(&[
        "-p",
        "false",
        "--csv",
        "-D",
        "runner.input.skip.size=1",
        "--define",
        "runner.input.process.size=2",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        workdir.output_file(".counters.csv"),
        "COUNTER_NAME,COUNTER_VALUE\nNUM_VALUES,2\nSUM_VALUES,5\n"
    );
}

#[test]
fn empty_input_creates_no_files() {
    let workdir = Workdir::with_config(&number_config("empty.txt"));

    let output = workdir.run(&["-p", "false", "--csv"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(workdir.output_files().is_empty());
}

#[test]
fn missing_property_exits_with_minus_five() {
    let config = number_config("numbers.txt").replace("runner.task.batch.size=2\n", "");
    let workdir = Workdir::with_config(&config);

    let output = workdir.run(&["-p", "false"]);

    assert_eq!(output.status.code(), status_of(-5));
    assert!(stderr(&output).contains("runner.task.batch.size"));
}

#[test]
fn unknown_task_exits_with_minus_four() {
    let config = number_config("numbers.txt").replace("number-aggregator", "no-such-task");
    let workdir = Workdir::with_config(&config);

    let output = workdir.run(&["-p", "false"]);

    assert_eq!(output.status.code(), status_of(-4));
}

#[test]
fn missing_configuration_file_exits_with_minus_two() {
    let workdir = Workdir::with_config("");
    std::fs::remove_file(workdir.path().join("runner.properties")).unwrap();

    let output = workdir.run(&["-p", "false"]);

    assert_eq!(output.status.code(), status_of(-2));
}

#[test]
fn directory_as_input_exits_with_minus_two() {
    let workdir = Workdir::with_config(&number_config("numbers.txt"));
    std::fs::create_dir(workdir.path().join("adir")).unwrap();

    let output = workdir.run(&["-p", "false", "-D", "runner.input.file=adir"]);

    assert_eq!(output.status.code(), status_of(-2));
}

#[test]
fn declined_prompt_exits_with_minus_six() {
    let workdir = Workdir::with_config(&number_config("numbers.txt"));

    let output = workdir.run_answering("n\n");

    assert_eq!(output.status.code(), status_of(-6));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("====== Task Properties ======"));
    assert!(stdout.contains("runner.task.class: number-aggregator"));
    assert!(workdir.output_files().is_empty());
}

#[test]
fn confirmed_prompt_runs() {
    let workdir = Workdir::with_config(&number_config("numbers.txt"));

    let output = workdir.run_answering("yes\n");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[test]
fn bad_arguments_exit_with_minus_six() {
    let workdir = Workdir::with_config(&number_config("numbers.txt"));

    let output = workdir.run(&["--prompt", "maybe"]);

    assert_eq!(output.status.code(), status_of(-6));
}

#[test]
fn help_exits_successfully() {
    let workdir = Workdir::with_config("");

    let output = workdir.run(&["--help"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--csv"));
}
