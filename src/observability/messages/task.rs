// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for events inside a running task.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A context-enrichment rule failed; the record is still delivered.
///
/// # Log Level
/// `warn!` - Degraded record
///
/// # Example
/// ```
/// use streamdag::observability::messages::task::EnrichmentFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "cannot index string");
/// let msg = EnrichmentFailed {
///     task: "tagger",
///     key: "user",
///     record_id: 7,
///     error: &error,
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct EnrichmentFailed<'a> {
    pub task: &'a str,
    pub key: &'a str,
    pub record_id: u64,
    pub error: &'a dyn std::error::Error,
}

impl Display for EnrichmentFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' could not set context '{}' on record {}: {}",
            self.task, self.key, self.record_id, self.error
        )
    }
}

impl StructuredLog for EnrichmentFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            task = self.task,
            key = self.key,
            record_id = self.record_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("enrichment", span_name = name, task = self.task, key = self.key)
    }
}

/// A context-enrichment rule produced no value; the key is left unset.
///
/// # Log Level
/// `debug!`
pub struct EnrichmentEmpty<'a> {
    pub task: &'a str,
    pub key: &'a str,
    pub record_id: u64,
}

impl Display for EnrichmentEmpty<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' context rule '{}' produced no value for record {}",
            self.task, self.key, self.record_id
        )
    }
}

impl StructuredLog for EnrichmentEmpty<'_> {
    fn log(&self) {
        tracing::debug!(task = self.task, key = self.key, record_id = self.record_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("enrichment", span_name = name, task = self.task, key = self.key)
    }
}

/// The `echo` task observed a record.
///
/// # Log Level
/// `info!` - This is the task's purpose
pub struct RecordEchoed<'a> {
    pub task: &'a str,
    pub record_id: u64,
    pub origin: &'a str,
    pub payload: &'a str,
}

impl Display for RecordEchoed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.payload)
    }
}

impl StructuredLog for RecordEchoed<'_> {
    fn log(&self) {
        tracing::info!(
            task = self.task,
            record_id = self.record_id,
            origin = self.origin,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("echo", span_name = name, task = self.task)
    }
}

/// A task finished `init`.
///
/// # Log Level
/// `debug!`
pub struct TaskInitialized<'a> {
    pub task: &'a str,
    pub task_type: &'a str,
    pub context_rules: usize,
}

impl Display for TaskInitialized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' of type '{}' initialised with {} context rules",
            self.task, self.task_type, self.context_rules
        )
    }
}

impl StructuredLog for TaskInitialized<'_> {
    fn log(&self) {
        tracing::debug!(
            task = self.task,
            task_type = self.task_type,
            context_rules = self.context_rules,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("task_init", span_name = name, task = self.task)
    }
}
