// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline and task lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Pipeline start and completion
//! * Task start, completion and failure
//! * Fan-out (mux) and fan-in (demux) coordinators closing their outputs

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Pipeline started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use streamdag::observability::messages::engine::PipelineStarted;
///
/// let msg = PipelineStarted {
///     task_count: 3,
///     mux_count: 1,
///     demux_count: 0,
///     channel_size: 10_000,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct PipelineStarted {
    pub task_count: usize,
    pub mux_count: usize,
    pub demux_count: usize,
    pub channel_size: usize,
}

impl Display for PipelineStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting pipeline: {} tasks, {} mux, {} demux, channel_size={}",
            self.task_count, self.mux_count, self.demux_count, self.channel_size
        )
    }
}

impl StructuredLog for PipelineStarted {
    fn log(&self) {
        tracing::info!(
            task_count = self.task_count,
            mux_count = self.mux_count,
            demux_count = self.demux_count,
            channel_size = self.channel_size,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            task_count = self.task_count,
            channel_size = self.channel_size,
        )
    }
}

/// Pipeline finished, with or without fatal failures.
///
/// # Log Level
/// `info!` when clean, `error!` when `failed_count > 0`
pub struct PipelineCompleted {
    pub task_count: usize,
    pub failed_count: usize,
    pub duration: Duration,
}

impl Display for PipelineCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.failed_count == 0 {
            write!(
                f,
                "Pipeline completed: {} tasks in {:?}",
                self.task_count, self.duration
            )
        } else {
            write!(
                f,
                "Pipeline completed with {} fatal task failures out of {} tasks in {:?}",
                self.failed_count, self.task_count, self.duration
            )
        }
    }
}

impl StructuredLog for PipelineCompleted {
    fn log(&self) {
        let duration_ms = self.duration.as_millis() as u64;
        if self.failed_count == 0 {
            tracing::info!(task_count = self.task_count, duration_ms, "{}", self);
        } else {
            tracing::error!(
                task_count = self.task_count,
                failed_count = self.failed_count,
                duration_ms,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_completed",
            span_name = name,
            task_count = self.task_count,
            failed_count = self.failed_count,
            duration = ?self.duration,
        )
    }
}

/// A task's scheduling unit started.
///
/// # Log Level
/// `debug!` - One per task
pub struct TaskStarted<'a> {
    pub task: &'a str,
    pub has_input: bool,
    pub has_output: bool,
}

impl TaskStarted<'_> {
    fn role(&self) -> &'static str {
        match (self.has_input, self.has_output) {
            (false, true) => "source",
            (true, false) => "sink",
            (true, true) => "transform",
            (false, false) => "standalone",
        }
    }
}

impl Display for TaskStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task '{}' started as {}", self.task, self.role())
    }
}

impl StructuredLog for TaskStarted<'_> {
    fn log(&self) {
        tracing::debug!(task = self.task, role = self.role(), "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("task", span_name = name, task = self.task, role = self.role())
    }
}

/// A task returned without error.
///
/// # Log Level
/// `debug!` - One per task
pub struct TaskFinished<'a> {
    pub task: &'a str,
    pub input_count: u64,
    pub duration: Duration,
}

impl Display for TaskFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' finished: {} records in, duration={:?}",
            self.task, self.input_count, self.duration
        )
    }
}

impl StructuredLog for TaskFinished<'_> {
    fn log(&self) {
        tracing::debug!(
            task = self.task,
            input_count = self.input_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("task_finished", span_name = name, task = self.task)
    }
}

/// A task returned an error.
///
/// # Log Level
/// `error!` when `fatal` (the task has `fail_on_error`), otherwise `warn!`
pub struct TaskFailed<'a> {
    pub task: &'a str,
    pub error: &'a dyn std::error::Error,
    pub fatal: bool,
}

impl Display for TaskFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.fatal {
            write!(f, "Task '{}' failed: {}", self.task, self.error)
        } else {
            write!(
                f,
                "Task '{}' stopped after error (fail_on_error=false): {}",
                self.task, self.error
            )
        }
    }
}

impl StructuredLog for TaskFailed<'_> {
    fn log(&self) {
        if self.fatal {
            tracing::error!(task = self.task, error = %self.error, "{}", self);
        } else {
            tracing::warn!(task = self.task, error = %self.error, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "task_failed",
            span_name = name,
            task = self.task,
            fatal = self.fatal,
        )
    }
}

/// A mux or demux drained its inputs and closed its outputs.
///
/// # Log Level
/// `debug!` - Coordinator bookkeeping
pub struct CoordinatorClosed<'a> {
    pub kind: &'a str,
    pub task: &'a str,
    pub records: u64,
}

impl Display for CoordinatorClosed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} for '{}' closed after {} records",
            self.kind, self.task, self.records
        )
    }
}

impl StructuredLog for CoordinatorClosed<'_> {
    fn log(&self) {
        tracing::debug!(kind = self.kind, task = self.task, records = self.records, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("coordinator", span_name = name, kind = self.kind, task = self.task)
    }
}
