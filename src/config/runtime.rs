// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::loader::{validate_channel_size, validate_task_names};
use crate::config::Config;
use crate::dag::{parse, Expr, Graph};
use crate::engine::Pipeline;
use crate::errors::{ConfigError, PipelineError};
use crate::tasks::TaskRegistry;

/// Turns a loaded [`Config`] into a runnable [`Pipeline`].
///
/// The topology comes from `dag` when present; otherwise the tasks are
/// chained in declaration order, the first acting as source and the last as
/// sink. The graph is validated before any task is constructed, so a bad
/// expression never triggers task side effects.
///
/// # Examples
///
/// ```no_run
/// use streamdag::config::{load_config, RuntimeBuilder};
/// use streamdag::tasks::TaskRegistry;
///
/// # async fn run() -> anyhow::Result<()> {
/// let cfg = load_config("pipeline.yaml").await?;
/// let pipeline = RuntimeBuilder::from_config(&cfg, &TaskRegistry::with_builtins()).await?;
/// let summary = pipeline.run().await?;
/// println!("{:?}", summary.input_counts);
/// # Ok(())
/// # }
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    pub async fn from_config(
        cfg: &Config,
        registry: &TaskRegistry,
    ) -> Result<Pipeline, PipelineError> {
        validate_task_names(cfg)?;
        validate_channel_size(cfg)?;
        let graph = Self::graph(cfg)?;

        let mut tasks = Vec::with_capacity(cfg.tasks.len());
        for task_cfg in &cfg.tasks {
            tasks.push(registry.create_initialized(task_cfg).await?);
        }

        Pipeline::new(graph, tasks, cfg.effective_channel_size())
    }

    /// Parses and resolves the topology without constructing any task.
    pub fn graph(cfg: &Config) -> Result<Graph, PipelineError> {
        let expr = match cfg.dag.as_deref().map(str::trim) {
            Some(source) if !source.is_empty() => parse(source)?,
            _ => {
                let names: Vec<&str> = cfg.tasks.iter().map(|t| t.name.as_str()).collect();
                Expr::chain(&names).ok_or(ConfigError::NoTasks)?
            }
        };
        let graph = Graph::build(&expr, |name| cfg.tasks.iter().any(|t| t.name == name))?;
        Ok(graph)
    }
}
