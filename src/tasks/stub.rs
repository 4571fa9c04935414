// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test-only tasks used to drive pipelines from unit and integration tests.
//!
//! * `emit` - source emitting `items`
//! * `collect` - records every payload it sees into a shared [`Collected`]
//!   map keyed by task name, forwarding when it has an output
//! * `fail` - drains its input, then fails with `message`; with
//!   `on_init: true` it fails during `init` instead

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::config::TaskConfig;
use crate::errors::{ConfigError, TaskError};
use crate::record::Record;
use crate::tasks::{decode_settings, BaseTask, TaskRegistry};
use crate::traits::{RecordReceiver, RecordSender, Task};

/// Records seen by every `collect` task, keyed by task name.
#[derive(Debug, Clone, Default)]
pub struct Collected(Arc<Mutex<BTreeMap<String, Vec<Record>>>>);

impl Collected {
    pub fn records(&self, task: &str) -> Vec<Record> {
        self.0
            .lock()
            .unwrap()
            .get(task)
            .cloned()
            .unwrap_or_default()
    }

    pub fn payloads(&self, task: &str) -> Vec<String> {
        self.records(task)
            .iter()
            .map(|r| r.data_lossy().to_string())
            .collect()
    }

    fn push(&self, task: &str, record: Record) {
        self.0
            .lock()
            .unwrap()
            .entry(task.to_string())
            .or_default()
            .push(record);
    }
}

/// Built-in tasks plus the stubs, with `collect` writing into `collected`.
pub fn registry(collected: &Collected) -> TaskRegistry {
    let mut registry = TaskRegistry::with_builtins();
    registry.register("emit", EmitTask::build);
    registry.register("fail", FailTask::build);
    let collected = collected.clone();
    registry.register("collect", move |cfg| {
        Ok(Box::new(CollectTask {
            base: BaseTask::from_config(cfg)?,
            collected: collected.clone(),
        }) as Box<dyn Task>)
    });
    registry
}

pub fn emit(name: &str, items: &[&str]) -> TaskConfig {
    TaskConfig::new(name, "emit").with_setting(
        "items",
        items.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
    )
}

pub fn collect(name: &str) -> TaskConfig {
    TaskConfig::new(name, "collect")
}

pub fn fail(name: &str, message: &str) -> TaskConfig {
    TaskConfig::new(name, "fail")
        .with_setting("message", message)
        .with_fail_on_error(true)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmitSettings {
    #[serde(default)]
    items: Vec<String>,
}

pub struct EmitTask {
    base: BaseTask,
    items: Vec<String>,
}

impl EmitTask {
    fn build(cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let settings: EmitSettings = decode_settings(cfg)?;
        Ok(Box::new(Self {
            base: BaseTask::from_config(cfg)?,
            items: settings.items,
        }))
    }
}

#[async_trait]
impl Task for EmitTask {
    async fn run(
        &mut self,
        input: Option<RecordReceiver>,
        output: Option<RecordSender>,
        _cancel: CancellationToken,
    ) -> Result<(), TaskError> {
        self.base.require_no_input(&input)?;
        self.base.require_output(&output)?;
        let Some(output) = output else {
            return Ok(());
        };
        for item in &self.items {
            self.base.send_data(item.clone(), &output).await?;
        }
        Ok(())
    }

    fn base(&self) -> &BaseTask {
        &self.base
    }
}

pub struct CollectTask {
    base: BaseTask,
    collected: Collected,
}

#[async_trait]
impl Task for CollectTask {
    async fn run(
        &mut self,
        input: Option<RecordReceiver>,
        output: Option<RecordSender>,
        _cancel: CancellationToken,
    ) -> Result<(), TaskError> {
        self.base.require_input(&input)?;
        let Some(mut input) = input else {
            return Ok(());
        };
        while let Some(record) = self.base.get_record(&mut input).await {
            self.collected.push(self.base.name(), record.clone());
            if let Some(output) = &output {
                self.base.send_record(record, output).await?;
            }
        }
        Ok(())
    }

    fn base(&self) -> &BaseTask {
        &self.base
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FailSettings {
    message: String,
    #[serde(default)]
    on_init: bool,
}

pub struct FailTask {
    base: BaseTask,
    settings: FailSettings,
}

impl FailTask {
    fn build(cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let settings: FailSettings = decode_settings(cfg)?;
        Ok(Box::new(Self {
            base: BaseTask::from_config(cfg)?,
            settings,
        }))
    }
}

#[async_trait]
impl Task for FailTask {
    async fn init(&mut self) -> Result<(), TaskError> {
        if self.settings.on_init {
            return Err(TaskError::custom(self.settings.message.clone()));
        }
        Ok(())
    }

    async fn run(
        &mut self,
        input: Option<RecordReceiver>,
        _output: Option<RecordSender>,
        _cancel: CancellationToken,
    ) -> Result<(), TaskError> {
        if let Some(mut input) = input {
            while self.base.get_record(&mut input).await.is_some() {}
        }
        Err(TaskError::custom(self.settings.message.clone()))
    }

    fn base(&self) -> &BaseTask {
        &self.base
    }
}
