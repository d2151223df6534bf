//! Module wrapping one sealed batch together with the task and scope it runs against.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::task::{RunScope, Task};

/// An ordered group of records, sealed once submitted.
#[derive(Debug)]
pub struct Batch<I> {
    seq: u64,
    records: Vec<I>,
}

impl<I> Batch<I> {
    pub fn new(seq: u64, records: Vec<I>) -> Self {
        Self { seq, records }
    }

    /// Position of the batch in submission order, starting at zero.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn records(&self) -> &[I] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How a batch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Succeeded,
    /// The task reported a soft failure
    Failed,
    /// The task returned an error
    Errored(String),
    Panicked(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub seq: u64,
    pub records: usize,
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == BatchStatus::Succeeded
    }
}

/// Schedulable unit: `(batch, scope, task)`.
pub struct BatchContainer<'a, T: Task> {
    batch: Batch<T::Record>,
    scope: RunScope<'a, T::Context>,
    task: &'a T,
}

impl<'a, T: Task> BatchContainer<'a, T> {
    pub fn new(batch: Batch<T::Record>, scope: RunScope<'a, T::Context>, task: &'a T) -> Self {
        Self { batch, scope, task }
    }

    /// Runs the task over the batch. Errors and panics are reported as outcomes, never propagated.
    pub fn call(self) -> BatchOutcome {
        let Self { batch, scope, task } = self;
        let result = catch_unwind(AssertUnwindSafe(|| task.execute_task(batch.records(), &scope)));

        let status = match result {
            Ok(Ok(true)) => BatchStatus::Succeeded,
            Ok(Ok(false)) => BatchStatus::Failed,
            Ok(Err(e)) => BatchStatus::Errored(format!("{e:#}")),
            Err(payload) => BatchStatus::Panicked(panic_message(payload.as_ref())),
        };

        BatchOutcome {
            seq: batch.seq(),
            records: batch.len(),
            status,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
