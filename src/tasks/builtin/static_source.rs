// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::{TaskConfig, Template};
use crate::errors::{ConfigError, TaskError};
use crate::tasks::{decode_settings, invalid_settings, BaseTask};
use crate::traits::{RecordReceiver, RecordSender, Task};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticSettings {
    #[serde(default)]
    pub items: Vec<Template>,
    /// Number of passes over `items`.
    #[serde(default = "default_repeat")]
    pub repeat: u64,
}

fn default_repeat() -> u64 {
    1
}

/// Source that emits each configured item as one record.
///
/// Items are templates; macros are expanded per item, so
/// `{{ macro "uuid" }}` yields a fresh value for every emitted record.
pub struct StaticTask {
    base: BaseTask,
    settings: StaticSettings,
}

impl StaticTask {
    pub fn new(base: BaseTask, settings: StaticSettings) -> Self {
        Self { base, settings }
    }

    pub fn build(cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let settings: StaticSettings = decode_settings(cfg)?;
        if settings.repeat == 0 {
            return Err(invalid_settings(cfg, "repeat must be at least 1"));
        }
        Ok(Box::new(Self::new(BaseTask::from_config(cfg)?, settings)))
    }
}

#[async_trait]
impl Task for StaticTask {
    async fn run(
        &mut self,
        input: Option<RecordReceiver>,
        output: Option<RecordSender>,
        cancel: CancellationToken,
    ) -> Result<(), TaskError> {
        self.base.require_no_input(&input)?;
        self.base.require_output(&output)?;
        let Some(output) = output else {
            return Ok(());
        };

        for _ in 0..self.settings.repeat {
            for item in &self.settings.items {
                let data = self.base.resolve(item)?;
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    sent = self.base.send_data(data, &output) => sent?,
                }
            }
        }
        Ok(())
    }

    fn base(&self) -> &BaseTask {
        &self.base
    }
}
