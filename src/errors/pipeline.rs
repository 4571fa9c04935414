// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by the pipeline scheduler.

use std::fmt;
use thiserror::Error;

use crate::errors::{ConfigError, GraphError, ParseError};

/// A fatal failure reported by one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: String,
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.task, self.message)
    }
}

/// The single error surface of a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid dag expression: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Every task with `fail_on_error` that returned an error.
    #[error("pipeline failed: {}", join_failures(.0))]
    TasksFailed(Vec<TaskFailure>),
}

fn join_failures(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
