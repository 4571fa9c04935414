// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by tasks, templates and the embedded query language.

use thiserror::Error;

/// Failure evaluating the embedded query language.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("query parse error at offset {offset}: {reason}")]
    Parse { offset: usize, reason: String },

    #[error("query execution error: {0}")]
    Execute(String),
}

/// Failure expanding a templated string at run time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// Every context placeholder whose key was absent on the record.
    #[error("context keys were not set: {}", .0.join(", "))]
    MissingContextKeys(Vec<String>),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Failure inside a task's `init` or `run`.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The task was wired with a channel shape it does not support.
    #[error("task '{name}' {reason}")]
    InvalidChannels { name: String, reason: &'static str },

    /// The downstream receiver was dropped before the task finished sending.
    #[error("downstream channel closed")]
    DownstreamClosed,

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

impl TaskError {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}
