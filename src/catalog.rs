//! Module mapping configured names onto task and parser implementations.
//!
//! Tasks are type-erased behind [`Job`] so that a name picked at runtime can still drive a fully
//! typed [`TaskRunner::execute_task`] call. Parsers are stored per record type and recovered by
//! downcasting; a parser whose records do not match the task's is rejected.

use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::Error;
use crate::config::Properties;
use crate::input::{IntegerLineParser, LineParser, PairIntegerCsvLineParser, StringLineParser};
use crate::runner::{RunReport, TaskRunner};
use crate::sample::{NumberAggregatorTask, PairAggregatorTask, WordCountTask};
use crate::task::{Context, Task};


type ParserFactory<R> = fn() -> Box<dyn LineParser<Record = R>>;
type JobFactory = fn() -> Box<dyn Job>;

struct ParserEntry {
    record_type: &'static str,
    // always a `ParserFactory<R>` for the registered record type
    factory: Box<dyn Any + Send + Sync>,
}

/// Registry of named task and parser factories.
#[derive(Default)]
pub struct Catalog {
    tasks: BTreeMap<String, JobFactory>,
    parsers: BTreeMap<String, ParserEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the built-in tasks and parsers.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog
            .register_task::<WordCountTask>("word-count")
            .register_task::<NumberAggregatorTask>("number-aggregator")
            .register_task::<PairAggregatorTask>("pair-aggregator")
            .register_parser::<StringLineParser>("string")
            .register_parser::<IntegerLineParser>("integer")
            .register_parser::<PairIntegerCsvLineParser>("pair-integer-csv");
        catalog
    }

    pub fn register_task<T>(&mut self, name: &str) -> &mut Self
    where
        T: Task + Default + 'static,
    {
        self.tasks.insert(name.to_string(), make_job::<T>);
        self
    }

    pub fn register_parser<P>(&mut self, name: &str) -> &mut Self
    where
        P: LineParser + Default + 'static,
        P::Record: 'static,
    {
        let factory: ParserFactory<P::Record> = make_parser::<P>;
        self.parsers.insert(
            name.to_string(),
            ParserEntry {
                record_type: type_name::<P::Record>(),
                factory: Box::new(factory),
            },
        );
        self
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn parser_names(&self) -> impl Iterator<Item = &str> {
        self.parsers.keys().map(String::as_str)
    }

    /// Instantiates the task registered under `name`.
    pub fn job(&self, name: &str) -> Result<Box<dyn Job>, Error> {
        self.tasks
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownTask(name.to_string()))
    }

    /// Instantiates the parser registered under `name`, provided it produces `R` records.
    pub fn parser<R: 'static>(&self, name: &str) -> Result<Box<dyn LineParser<Record = R>>, Error> {
        let entry = self
            .parsers
            .get(name)
            .ok_or_else(|| Error::UnknownParser(name.to_string()))?;

        match entry.factory.downcast_ref::<ParserFactory<R>>() {
            Some(factory) => Ok(factory()),
            None => {
                debug!(parser = name, produces = entry.record_type, "parser record type mismatch");
                Err(Error::ParserMismatch {
                    parser: name.to_string(),
                    expected: type_name::<R>(),
                })
            }
        }
    }
}

fn make_parser<P: LineParser + Default + 'static>() -> Box<dyn LineParser<Record = P::Record>> {
    Box::new(P::default())
}

fn make_job<T: Task + Default + 'static>() -> Box<dyn Job> {
    Box::new(TaskJob(T::default()))
}

/// A task picked by name, not yet bound to a context or parser.
pub trait Job {
    fn task_name(&self) -> &'static str;

    /// Configuration keys required by the task's context.
    fn required_property_names(&self) -> &'static [&'static str];

    /// Initializes the context from `properties` and resolves the parser named `parser`.
    fn prepare(
        self: Box<Self>,
        properties: &Properties,
        catalog: &Catalog,
        parser: &str,
    ) -> Result<Box<dyn PreparedJob>, Error>;
}

/// A task with its initialized context and parser, ready to run.
pub trait PreparedJob {
    fn task_name(&self) -> &'static str;

    fn execute(&self, runner: &mut TaskRunner, input: &Path) -> Result<RunReport, Error>;
}

struct TaskJob<T>(T);

impl<T: Task + 'static> Job for TaskJob<T> {
    fn task_name(&self) -> &'static str {
        self.0.name()
    }

    fn required_property_names(&self) -> &'static [&'static str] {
        T::Context::required_property_names()
    }

    fn prepare(
        self: Box<Self>,
        properties: &Properties,
        catalog: &Catalog,
        parser: &str,
    ) -> Result<Box<dyn PreparedJob>, Error> {
        let context = T::Context::init(properties).map_err(Error::ContextInit)?;
        let parser = catalog.parser::<T::Record>(parser)?;
        Ok(Box::new(PreparedTask {
            task: self.0,
            context,
            parser,
        }))
    }
}

struct PreparedTask<T: Task> {
    task: T,
    context: T::Context,
    parser: Box<dyn LineParser<Record = T::Record>>,
}

impl<T: Task + 'static> PreparedJob for PreparedTask<T> {
    fn task_name(&self) -> &'static str {
        self.task.name()
    }

    fn execute(&self, runner: &mut TaskRunner, input: &Path) -> Result<RunReport, Error> {
        runner.execute_task(input, &self.parser, &self.task, &self.context)
    }
}
