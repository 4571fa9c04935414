// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::TaskConfig;
use crate::errors::{ConfigError, TaskError};
use crate::tasks::{decode_settings, BaseTask};
use crate::traits::{RecordReceiver, RecordSender, Task};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelaySettings {
    #[serde(default)]
    pub millis: u64,
}

/// Holds each record for a fixed time before forwarding it.
pub struct DelayTask {
    base: BaseTask,
    settings: DelaySettings,
}

impl DelayTask {
    pub fn new(base: BaseTask, settings: DelaySettings) -> Self {
        Self { base, settings }
    }

    pub fn build(cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let settings: DelaySettings = decode_settings(cfg)?;
        Ok(Box::new(Self::new(BaseTask::from_config(cfg)?, settings)))
    }
}

#[async_trait]
impl Task for DelayTask {
    async fn run(
        &mut self,
        input: Option<RecordReceiver>,
        output: Option<RecordSender>,
        cancel: CancellationToken,
    ) -> Result<(), TaskError> {
        self.base.require_input(&input)?;
        self.base.require_output(&output)?;
        let (Some(mut input), Some(output)) = (input, output) else {
            return Ok(());
        };

        let delay = Duration::from_millis(self.settings.millis);
        loop {
            let record = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                record = self.base.get_record(&mut input) => record,
            };
            let Some(record) = record else {
                break;
            };

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
            self.base.send_record(record, &output).await?;
        }
        Ok(())
    }

    fn base(&self) -> &BaseTask {
        &self.base
    }
}
