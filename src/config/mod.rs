//! Module turning the user-provided configuration (properties file, environment, command line
//! definitions) into the settings the runner needs.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::warn;

use crate::error::{Error, invalid_property, io_error};


pub const RUNNER_TASK_CLASS: &str = "runner.task.class";
pub const RUNNER_PARSER_CLASS: &str = "runner.parser.class";
pub const RUNNER_INPUT_FILE: &str = "runner.input.file";
pub const RUNNER_TASK_THREADS: &str = "runner.task.threads";
pub const RUNNER_TASK_BATCH_SIZE: &str = "runner.task.batch.size";
pub const RUNNER_INPUT_SKIP_SIZE: &str = "runner.input.skip.size";
pub const RUNNER_INPUT_PROCESS_SIZE: &str = "runner.input.process.size";
pub const RUNNER_INPUT_SKIP_MALFORMED: &str = "runner.input.skip.malformed";

pub const DEFAULT_CONFIG_PATH: &str = "config/runner.properties";

/// Keys the harness itself insists on, independent of the chosen task.
pub const REQUIRED_PROPERTIES: [&str; 5] = [
    RUNNER_INPUT_FILE,
    RUNNER_PARSER_CLASS,
    RUNNER_TASK_BATCH_SIZE,
    RUNNER_TASK_CLASS,
    RUNNER_TASK_THREADS,
];

/// Flat key to string configuration mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a properties file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        Ok(Self::parse(&content))
    }

    /// Parses the `key=value` / `key: value` / `key value` format, skipping `#` and `!` comments.
    /// A line ending in an odd number of backslashes continues on the next line.
    pub fn parse(content: &str) -> Self {
        let mut properties = Self::new();
        let mut pending = String::new();

        for raw in content.lines() {
            let line = raw.trim_start();
            let is_comment = line.starts_with('#') || line.starts_with('!');
            if pending.is_empty() && (line.is_empty() || is_comment) {
                continue;
            }

            if ends_with_continuation(line) {
                pending.push_str(&line[..line.len() - 1]);
                continue;
            }
            pending.push_str(line);

            let (key, value) = split_entry(&pending);
            if !key.is_empty() {
                properties.insert(key, value);
            }
            pending.clear();
        }

        if !pending.is_empty() {
            let (key, value) = split_entry(&pending);
            if !key.is_empty() {
                properties.insert(key, value);
            }
        }

        properties
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Overlays `overrides` on top of the current entries; overriding values win.
    pub fn overlay<K, V>(&mut self, overrides: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in overrides {
            self.insert(key, value);
        }
    }

    /// Overlays the process environment, using the variable names verbatim as keys.
    pub fn overlay_env(&mut self) {
        self.overlay_os(std::env::vars_os());
    }

    /// Overlays platform strings, dropping (and warning about) pairs that are not valid UTF-8.
    pub fn overlay_os(&mut self, overrides: impl IntoIterator<Item = (OsString, OsString)>) {
        for (key, value) in overrides {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => self.insert(key, value),
                (key, _) => {
                    let key = key.unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
                    warn!(%key, "ignoring environment variable that is not valid UTF-8");
                }
            }
        }
    }

    /// Fails with the first key (in the given order) that is not configured.
    pub fn require<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Result<(), Error> {
        match keys.into_iter().find(|key| !self.contains(key)) {
            Some(missing) => Err(Error::MissingProperty(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Parses the value of `key`, falling back to `default` when the key is absent.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, Error>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(value) => parse_value(key, value),
            None => Ok(default),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut properties = Self::new();
        properties.overlay(iter);
        properties
    }
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

fn split_entry(entry: &str) -> (String, String) {
    let entry = entry.trim();
    match entry.find(['=', ':', ' ', '\t']) {
        Some(idx) => {
            let key = entry[..idx].trim_end();
            let mut rest = entry[idx..].trim_start();
            if rest.starts_with(['=', ':']) {
                rest = rest[1..].trim_start();
            }
            (key.to_string(), rest.to_string())
        }
        None => (entry.to_string(), String::new()),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| invalid_property(key, value, e.to_string()))
}

/// Validated runner settings extracted from [`Properties`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    pub task: String,
    pub parser: String,
    pub input_file: PathBuf,
    pub num_threads: usize,
    pub batch_size: usize,
    pub skip_size: usize,
    /// `None` means the whole input is consumed
    pub process_size: Option<usize>,
    pub skip_malformed: bool,
}

impl RunnerSettings {
    pub fn from_properties(properties: &Properties) -> Result<Self, Error> {
        properties.require(REQUIRED_PROPERTIES)?;

        let required = |key: &str| -> Result<String, Error> {
            properties
                .get(key)
                .map(|v| v.trim().to_string())
                .ok_or_else(|| Error::MissingProperty(key.to_string()))
        };

        let num_threads = positive(properties, RUNNER_TASK_THREADS)?;
        let batch_size = positive(properties, RUNNER_TASK_BATCH_SIZE)?;
        let process_size = match properties.get(RUNNER_INPUT_PROCESS_SIZE) {
            Some(value) => Some(parse_value(RUNNER_INPUT_PROCESS_SIZE, value)?),
            None => None,
        };

        Ok(Self {
            task: required(RUNNER_TASK_CLASS)?,
            parser: required(RUNNER_PARSER_CLASS)?,
            input_file: PathBuf::from(required(RUNNER_INPUT_FILE)?),
            num_threads,
            batch_size,
            skip_size: properties.parse_or(RUNNER_INPUT_SKIP_SIZE, 0)?,
            process_size,
            skip_malformed: properties.parse_or(RUNNER_INPUT_SKIP_MALFORMED, false)?,
        })
    }
}

fn positive(properties: &Properties, key: &str) -> Result<usize, Error> {
    let value = properties
        .get(key)
        .ok_or_else(|| Error::MissingProperty(key.to_string()))?;
    let parsed: usize = parse_value(key, value)?;
    if parsed == 0 {
        return Err(invalid_property(key, value, "must be greater than zero"));
    }
    Ok(parsed)
}
