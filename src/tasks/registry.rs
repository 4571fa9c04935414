// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Mapping from task type names to constructors.
//!
//! A registry is built once at startup and passed to the runtime builder;
//! it is never reached through a global, so tests can register their own
//! task types without interfering with each other.

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::TaskConfig;
use crate::errors::ConfigError;
use crate::observability::messages::task::TaskInitialized;
use crate::observability::messages::StructuredLog;
use crate::tasks::builtin;
use crate::traits::Task;

/// Builds a task with its defaults from its configuration block.
pub type TaskConstructor =
    Arc<dyn Fn(&TaskConfig) -> Result<Box<dyn Task>, ConfigError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct TaskRegistry {
    constructors: BTreeMap<String, TaskConstructor>,
}

impl TaskRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in task type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, task_type: &str, constructor: F)
    where
        F: Fn(&TaskConfig) -> Result<Box<dyn Task>, ConfigError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(task_type.to_string(), Arc::new(constructor));
    }

    pub fn contains(&self, task_type: &str) -> bool {
        self.constructors.contains_key(task_type)
    }

    pub fn task_types(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Constructs and decodes a task without initialising it.
    pub fn create(&self, cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let constructor =
            self.constructors
                .get(&cfg.task_type)
                .ok_or_else(|| ConfigError::UnknownTaskType {
                    name: cfg.name.clone(),
                    task_type: cfg.task_type.clone(),
                })?;
        constructor(cfg)
    }

    /// Constructs a task and runs its `init`.
    pub async fn create_initialized(&self, cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let mut task = self.create(cfg)?;
        task.init().await.map_err(|source| ConfigError::Init {
            name: cfg.name.clone(),
            source,
        })?;
        TaskInitialized {
            task: &cfg.name,
            task_type: &cfg.task_type,
            context_rules: cfg.context.len(),
        }
        .log();
        Ok(task)
    }
}

impl fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("task_types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Decodes a task's type-specific keys into its settings struct.
pub fn decode_settings<T: DeserializeOwned>(cfg: &TaskConfig) -> Result<T, ConfigError> {
    serde_yaml::from_value(serde_yaml::Value::Mapping(cfg.settings.clone())).map_err(|e| {
        ConfigError::InvalidSettings {
            name: cfg.name.clone(),
            reason: e.to_string(),
        }
    })
}

/// Shorthand for a settings validation failure.
pub fn invalid_settings(cfg: &TaskConfig, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidSettings {
        name: cfg.name.clone(),
        reason: reason.into(),
    }
}
