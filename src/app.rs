//! Module turning a configuration into a run: settings are resolved and validated, the task and
//! parser are looked up by name, the user optionally confirms, and the runner executes.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::info;

use crate::Error;
use crate::catalog::Catalog;
use crate::config::{DEFAULT_CONFIG_PATH, Properties, REQUIRED_PROPERTIES, RunnerSettings};
use crate::error::io_error;
use crate::output::CsvStatisticsOutputWriter;
use crate::runner::{RunReport, TaskRunner};


/// How the application was invoked.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub config_path: PathBuf,
    /// Ask for confirmation before executing
    pub prompt: bool,
    /// Also write the statistics as CSV files
    pub csv: bool,
    /// `key=value` definitions applied last, overriding file and environment
    pub defines: Vec<(String, String)>,
    /// Overrides the default `output-files` directory
    pub output_dir: Option<PathBuf>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            prompt: true,
            csv: false,
            defines: Vec::new(),
            output_dir: None,
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Completed(RunReport),
    /// The user did not confirm the settings
    Declined,
}

/// Runs the configured task, prompting on stdin/stdout when asked to.
pub fn run(options: &AppOptions, catalog: &Catalog) -> Result<Outcome, Error> {
    let stdin = io::stdin();
    run_with_io(options, catalog, &mut stdin.lock(), &mut io::stdout())
}

/// Same as [`run`], with the prompt reading from `input` and writing to `output`.
pub fn run_with_io<R: BufRead, W: Write>(
    options: &AppOptions,
    catalog: &Catalog,
    input: &mut R,
    output: &mut W,
) -> Result<Outcome, Error> {
    let properties = resolve_properties(options)?;
    let settings = RunnerSettings::from_properties(&properties)?;

    let job = catalog.job(&settings.task)?;
    let context_keys = job.required_property_names();
    properties.require(context_keys.iter().copied())?;

    let prepared = job.prepare(&properties, catalog, &settings.parser)?;

    let mut runner = TaskRunner::from_settings(&settings)?;
    if options.csv {
        runner = runner.with_alternate_writer(CsvStatisticsOutputWriter);
    }
    if let Some(dir) = &options.output_dir {
        runner = runner.with_output_dir(dir);
    }

    if options.prompt {
        let keys: BTreeSet<&str> = REQUIRED_PROPERTIES
            .iter()
            .chain(context_keys)
            .copied()
            .collect();
        let confirmed = prompt_user(&properties, keys, input, output)
            .map_err(|e| io_error("<stdin>", e))?;
        if !confirmed {
            info!("User exited");
            return Ok(Outcome::Declined);
        }
    }

    writeln!(output, "Starting Process with given parameters...")
        .map_err(|e| io_error("<stdout>", e))?;
    info!(task = prepared.task_name(), input = %settings.input_file.display(), "starting run");
    let report = prepared.execute(&mut runner, &settings.input_file)?;
    Ok(Outcome::Completed(report))
}

/// Loads the properties file and applies the environment and the command line definitions on top.
pub fn resolve_properties(options: &AppOptions) -> Result<Properties, Error> {
    let mut properties = Properties::load(&options.config_path)?;
    properties.overlay_env();
    properties.overlay(options.defines.iter().cloned());
    Ok(properties)
}

/// Prints the given settings and asks for confirmation. Only `y` or `yes` (any case) confirms.
pub fn prompt_user<'k, R: BufRead, W: Write>(
    properties: &Properties,
    keys: impl IntoIterator<Item = &'k str>,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    writeln!(output, "====== Task Properties ======")?;
    for key in keys {
        writeln!(output, "{key}: {}", properties.get(key).unwrap_or("<unset>"))?;
    }
    writeln!(output, "\nContinue? (Y/n)")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
