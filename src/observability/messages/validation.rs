// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for graph and configuration validation.
//!
//! This module contains message types for logging events related to:
//! * Cyclic dependency detection
//! * Unresolved task names in a DAG expression
//! * Declared tasks that the DAG expression never references

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Cyclic dependency detected while building the graph.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use streamdag::observability::messages::validation::CyclicDependencyDetected;
///
/// let cycle = vec!["x".to_string(), "y".to_string(), "x".to_string()];
/// let msg = CyclicDependencyDetected { cycle: &cycle };
///
/// tracing::error!("{}", msg);
/// ```
pub struct CyclicDependencyDetected<'a> {
    pub cycle: &'a [String],
}

impl Display for CyclicDependencyDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cyclic dependency detected: {}", self.cycle.join(" -> "))
    }
}

impl StructuredLog for CyclicDependencyDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
        )
    }
}

/// A DAG expression names a task that is not declared.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct TaskNotFound<'a> {
    pub name: &'a str,
}

impl Display for TaskNotFound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "DAG expression references undeclared task '{}'", self.name)
    }
}

impl StructuredLog for TaskNotFound<'_> {
    fn log(&self) {
        tracing::error!(task = self.name, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("task_not_found", span_name = name, task = self.name)
    }
}

/// A declared task is absent from the DAG expression and will not run.
///
/// # Log Level
/// `warn!` - Potential configuration mistake
pub struct UnusedTask<'a> {
    pub task: &'a str,
}

impl Display for UnusedTask<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' is declared but not referenced by the dag expression; it will not run",
            self.task
        )
    }
}

impl StructuredLog for UnusedTask<'_> {
    fn log(&self) {
        tracing::warn!(task = self.task, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("unused_task", span_name = name, task = self.task)
    }
}
