//! Module defining the contracts user code implements: the per-batch [`Task`] and its run-wide
//! [`Context`].

use crate::config::Properties;
use crate::files::FileWriterRegistry;
use crate::stats::StatsRegistry;

/// Task-scoped state, initialized exactly once from the configuration before any batch runs.
///
/// The context is shared by all workers; any interior mutation must be synchronized by the
/// implementation.
pub trait Context: Sized + Sync {
    fn init(properties: &Properties) -> anyhow::Result<Self>;

    /// Configuration keys this context insists on, checked before [`Context::init`] is called.
    fn required_property_names() -> &'static [&'static str] {
        &[]
    }
}

/// Context for tasks that need nothing beyond the runner's own settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultContext;

impl Context for DefaultContext {
    fn init(_properties: &Properties) -> anyhow::Result<Self> {
        Ok(Self)
    }
}

/// Everything a task invocation can reach: its context and the run's statistics and output files.
pub struct RunScope<'r, C> {
    context: &'r C,
    stats: &'r StatsRegistry,
    files: &'r FileWriterRegistry,
}

impl<'r, C> RunScope<'r, C> {
    pub fn new(context: &'r C, stats: &'r StatsRegistry, files: &'r FileWriterRegistry) -> Self {
        Self {
            context,
            stats,
            files,
        }
    }

    pub fn context(&self) -> &'r C {
        self.context
    }

    pub fn stats(&self) -> &'r StatsRegistry {
        self.stats
    }

    pub fn files(&self) -> &'r FileWriterRegistry {
        self.files
    }
}

impl<C> Clone for RunScope<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for RunScope<'_, C> {}

/// A unit of work applied to each batch of records.
///
/// `execute_task` is called concurrently from several workers with the same context. Returning
/// `Ok(false)` or an error marks the batch as failed without stopping the run.
pub trait Task: Sync {
    type Record: Send;
    type Context: Context;

    fn execute_task(
        &self,
        batch: &[Self::Record],
        scope: &RunScope<'_, Self::Context>,
    ) -> anyhow::Result<bool>;

    /// Runs once after every batch completed, before the statistics are written.
    fn post_execute(&self, _scope: &RunScope<'_, Self::Context>) {}

    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}
