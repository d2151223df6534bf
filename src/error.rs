//! Module defining the errors which are exposed to the users of the crate

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid CSV, either while parsing a line or while writing statistics
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A key the harness or the task context insists on is absent from the configuration
    #[error("missing required property: {0}")]
    MissingProperty(String),

    /// A key is present but its value cannot be used, e.g., a non-numeric thread count
    #[error("invalid value '{value}' for property {key}: {reason}")]
    InvalidProperty {
        key: String,
        value: String,
        reason: String,
    },

    #[error("no task registered under the name '{0}'")]
    UnknownTask(String),

    #[error("no parser registered under the name '{0}'")]
    UnknownParser(String),

    /// The configured parser produces records the configured task cannot consume
    #[error("parser '{parser}' does not produce records of type {expected}")]
    ParserMismatch {
        parser: String,
        expected: &'static str,
    },

    /// The task context rejected the configuration during its one-time initialization
    #[error("failed to initialize the task context: {0:#}")]
    ContextInit(anyhow::Error),

    /// A line the parser could not turn into a record
    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("output file {} is already closed", .0.display())]
    FileClosed(PathBuf),

    /// The runner was built with parameters it cannot work with (e.g., zero threads)
    #[error("invalid runner parameters: {0}")]
    InvalidRunner(String),
}

impl Error {
    /// The process exit code reported by the binary when this error aborts a run.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io { .. } => -2,
            Error::ContextInit(_) | Error::ParserMismatch { .. } => -3,
            Error::UnknownTask(_) | Error::UnknownParser(_) => -4,
            Error::MissingProperty(_)
            | Error::InvalidProperty { .. }
            | Error::InvalidRunner(_) => -5,
            Error::Csv(_) | Error::Parse { .. } | Error::FileClosed(_) => -1,
        }
    }
}

pub(crate) fn io_error(path: impl AsRef<Path>, source: std::io::Error) -> Error {
    Error::Io {
        path: path.as_ref().to_path_buf(),
        source,
    }
}

pub(crate) fn invalid_property(
    key: impl Into<String>,
    value: impl Into<String>,
    reason: impl Into<String>,
) -> Error {
    Error::InvalidProperty {
        key: key.into(),
        value: value.into(),
        reason: reason.into(),
    }
}

pub(crate) fn parse_error(line: u64, message: impl Into<String>) -> Error {
    Error::Parse {
        line,
        message: message.into(),
    }
}
