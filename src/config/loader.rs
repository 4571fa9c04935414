// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::consts::{DEFAULT_CHANNEL_SIZE, DEFAULT_SECRET_TIMEOUT, MAX_CHANNEL_SIZE};
use crate::config::secrets::{NoSecretStore, SecretStore};
use crate::config::template;
use crate::errors::ConfigError;

/// Main configuration structure for a streaming pipeline.
///
/// Loaded from a YAML document after load-time template expansion.
///
/// # Fields
/// * `tasks` - Ordered task definitions; in linear form this order is the wiring
/// * `channel_size` - Capacity of every inter-task channel (default 10 000 when ≤ 0,
///   at most [`MAX_CHANNEL_SIZE`])
/// * `dag` - Optional DAG expression for non-linear topologies
///
/// # Example
/// ```yaml
/// channel_size: 500
/// dag: src >> [upper, audit]
/// tasks:
///   - name: src
///     type: static
///     items: ["a", "b"]
///   - name: upper
///     type: echo
///   - name: audit
///     type: file
///     path: /tmp/audit-{{ macro "unixtime" }}.log
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
    #[serde(default)]
    pub channel_size: i64,
    #[serde(default)]
    pub dag: Option<String>,
}

impl Config {
    /// Channel capacity after applying the default for non-positive values.
    /// Oversized values are rejected by the loader; here they saturate.
    pub fn effective_channel_size(&self) -> usize {
        if self.channel_size <= 0 {
            DEFAULT_CHANNEL_SIZE
        } else {
            usize::try_from(self.channel_size)
                .unwrap_or(MAX_CHANNEL_SIZE)
                .min(MAX_CHANNEL_SIZE)
        }
    }
}

/// Configuration for a single task.
///
/// The common keys are decoded here; every other key lands in `settings` and
/// is decoded by the constructor registered for `task_type`.
///
/// # Example
/// ```yaml
/// name: tagger
/// type: meta
/// fail_on_error: true
/// context:
///   user: .user.name
/// values:
///   seen_at: '{{ macro "timestamp" }}'
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub fail_on_error: bool,
    /// Enrichment rules: context key to query.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    #[serde(flatten)]
    pub settings: serde_yaml::Mapping,
}

impl TaskConfig {
    pub fn new(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_type: task_type.into(),
            fail_on_error: false,
            context: BTreeMap::new(),
            settings: serde_yaml::Mapping::new(),
        }
    }

    /// Adds a type-specific setting. Used when building configs in code.
    pub fn with_setting(mut self, key: &str, value: impl Into<serde_yaml::Value>) -> Self {
        self.settings
            .insert(serde_yaml::Value::String(key.to_string()), value.into());
        self
    }

    pub fn with_context_rule(mut self, key: &str, query: &str) -> Self {
        self.context.insert(key.to_string(), query.to_string());
        self
    }

    pub fn with_fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Loads configuration text, running the load-time template pass first.
///
/// Environment access and the secret backend are injected so that tests can
/// run in parallel without touching process state.
#[derive(Clone)]
pub struct ConfigLoader {
    secrets: Arc<dyn SecretStore>,
    secret_timeout: Duration,
    env: EnvLookup,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            secrets: Arc::new(NoSecretStore),
            secret_timeout: DEFAULT_SECRET_TIMEOUT,
            env: Arc::new(|key: &str| std::env::var(key).ok()),
        }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secrets = store;
        self
    }

    pub fn with_secret_timeout(mut self, timeout: Duration) -> Self {
        self.secret_timeout = timeout;
        self
    }

    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(env);
        self
    }

    /// Runs load-time expansion over raw configuration text.
    pub async fn expand(&self, raw: &str) -> Result<String, ConfigError> {
        template::check_reserved(raw)?;

        let mut secrets = HashMap::new();
        for path in template::secret_paths(raw)? {
            let value = self.fetch_secret(&path).await?;
            secrets.insert(path, value);
        }

        template::expand(raw, self.env.as_ref(), &secrets)
    }

    async fn fetch_secret(&self, path: &str) -> Result<String, ConfigError> {
        match tokio::time::timeout(self.secret_timeout, self.secrets.get(path)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ConfigError::Secret {
                path: path.to_string(),
                reason: format!("{:#}", e),
            }),
            Err(_) => Err(ConfigError::SecretTimeout {
                path: path.to_string(),
                timeout: self.secret_timeout,
            }),
        }
    }

    /// Expands and parses configuration text, then checks task names and
    /// channel size.
    pub async fn load_str(&self, raw: &str) -> Result<Config, ConfigError> {
        let expanded = self.expand(raw).await?;
        let cfg: Config = serde_yaml::from_str(&expanded)?;
        validate_task_names(&cfg)?;
        validate_channel_size(&cfg)?;
        Ok(cfg)
    }

    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        self.load_str(&raw).await
    }
}

/// Load a config from a YAML file using the process environment and no
/// secret backend.
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    ConfigLoader::new().load_file(path).await
}

pub(crate) fn validate_task_names(cfg: &Config) -> Result<(), ConfigError> {
    let mut seen = std::collections::HashSet::new();
    for (index, task) in cfg.tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            return Err(ConfigError::InvalidTask {
                index,
                reason: "task name must not be empty".to_string(),
            });
        }
        if task.task_type.trim().is_empty() {
            return Err(ConfigError::InvalidTask {
                index,
                reason: "task type must not be empty".to_string(),
            });
        }
        if !seen.insert(task.name.as_str()) {
            return Err(ConfigError::DuplicateTaskName(task.name.clone()));
        }
    }
    Ok(())
}

pub(crate) fn validate_channel_size(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.channel_size > 0 && cfg.channel_size as u64 > MAX_CHANNEL_SIZE as u64 {
        return Err(ConfigError::ChannelSizeTooLarge {
            size: cfg.channel_size,
            max: MAX_CHANNEL_SIZE,
        });
    }
    Ok(())
}
