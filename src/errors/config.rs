// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while loading a pipeline configuration.
//!
//! Every variant here is fatal at load time: the process reports the message
//! and exits before any task runs.

use std::time::Duration;
use thiserror::Error;

use crate::errors::TaskError;

/// Failure to turn configuration text into validated, initialised tasks.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A `{{ ... }}` block names a function the loader does not provide.
    #[error("unknown template function '{0}'")]
    UnknownTemplateFunction(String),

    /// A `{{ ... }}` block is not of the form `{{ func "ARG" }}`.
    #[error("malformed template expression '{0}'")]
    MalformedTemplate(String),

    /// `macro` was called with a name outside the supported set.
    #[error("unknown macro '{0}' (expected one of: unixtime, timestamp, microtimestamp, uuid)")]
    UnknownMacro(String),

    /// The raw text already contains a deferred-substitution sentinel.
    #[error("configuration contains reserved placeholder text '{0}'")]
    ReservedPlaceholder(String),

    /// The secret store returned an error for a `secret` call.
    #[error("failed to fetch secret '{path}': {reason}")]
    Secret { path: String, reason: String },

    /// The secret store did not answer within the loader timeout.
    #[error("timed out after {timeout:?} fetching secret '{path}'")]
    SecretTimeout { path: String, timeout: Duration },

    /// The expanded text is not a valid configuration document.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A task object lacks its `type` or `name`, or the top level is malformed.
    #[error("invalid task definition at index {index}: {reason}")]
    InvalidTask { index: usize, reason: String },

    /// `channel_size` exceeds what a bounded channel can hold.
    #[error("channel_size {size} exceeds the maximum of {max}")]
    ChannelSizeTooLarge { size: i64, max: usize },

    /// The document declares no tasks.
    #[error("configuration declares no tasks")]
    NoTasks,

    /// Two tasks share a name.
    #[error("duplicate task name '{0}'")]
    DuplicateTaskName(String),

    /// No constructor is registered for the task type.
    #[error("task '{name}' has unknown type '{task_type}'")]
    UnknownTaskType { name: String, task_type: String },

    /// The task's type-specific settings failed to decode or validate.
    #[error("task '{name}' has invalid settings: {reason}")]
    InvalidSettings { name: String, reason: String },

    /// A context-enrichment rule did not compile.
    #[error("task '{name}' has invalid context rule '{key}': {reason}")]
    InvalidContextRule {
        name: String,
        key: String,
        reason: String,
    },

    /// The task's `init` failed.
    #[error("failed to initialise task '{name}': {source}")]
    Init {
        name: String,
        #[source]
        source: TaskError,
    },
}
