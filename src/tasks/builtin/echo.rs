// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::{TaskConfig, Template};
use crate::errors::{ConfigError, TaskError};
use crate::observability::messages::task::RecordEchoed;
use crate::observability::messages::StructuredLog;
use crate::tasks::{decode_settings, BaseTask};
use crate::traits::{RecordReceiver, RecordSender, Task};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EchoSettings {
    /// Prepended to each logged payload; may reference record context.
    #[serde(default)]
    pub prefix: Template,
}

/// Logs every payload and forwards the record unchanged when it has an output.
pub struct EchoTask {
    base: BaseTask,
    settings: EchoSettings,
}

impl EchoTask {
    pub fn new(base: BaseTask, settings: EchoSettings) -> Self {
        Self { base, settings }
    }

    pub fn build(cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let settings: EchoSettings = decode_settings(cfg)?;
        Ok(Box::new(Self::new(BaseTask::from_config(cfg)?, settings)))
    }
}

#[async_trait]
impl Task for EchoTask {
    async fn run(
        &mut self,
        input: Option<RecordReceiver>,
        output: Option<RecordSender>,
        cancel: CancellationToken,
    ) -> Result<(), TaskError> {
        self.base.require_input(&input)?;
        let Some(mut input) = input else {
            return Ok(());
        };

        loop {
            let record = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                record = self.base.get_record(&mut input) => record,
            };
            let Some(record) = record else {
                break;
            };

            let prefix = self.base.resolve(&self.settings.prefix)?;
            let payload = format!("{}{}", prefix, record.data_lossy());
            RecordEchoed {
                task: self.base.name(),
                record_id: record.id,
                origin: &record.origin,
                payload: &payload,
            }
            .log();

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
