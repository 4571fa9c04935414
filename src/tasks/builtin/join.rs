// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use bytes::{BufMut, BytesMut};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::TaskConfig;
use crate::errors::{ConfigError, TaskError};
use crate::tasks::{decode_settings, invalid_settings, BaseTask};
use crate::traits::{RecordReceiver, RecordSender, Task};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinSettings {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Records per emitted batch.
    #[serde(default = "default_size")]
    pub size: usize,
}

fn default_delimiter() -> String {
    "\n".to_string()
}

fn default_size() -> usize {
    10
}

/// Concatenates every `size` payloads into one record.
///
/// A partial batch is flushed when the input closes. Batches carry the meta
/// and context of their last record.
pub struct JoinTask {
    base: BaseTask,
    settings: JoinSettings,
}

impl JoinTask {
    pub fn new(base: BaseTask, settings: JoinSettings) -> Self {
        Self { base, settings }
    }

    pub fn build(cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let settings: JoinSettings = decode_settings(cfg)?;
        if settings.size == 0 {
            return Err(invalid_settings(cfg, "size must be greater than zero"));
        }
        Ok(Box::new(Self::new(BaseTask::from_config(cfg)?, settings)))
    }

    async fn flush(
        &self,
        buffer: &mut BytesMut,
        pending: &mut usize,
        output: &RecordSender,
    ) -> Result<(), TaskError> {
        if *pending == 0 {
            return Ok(());
        }
        let mut batch = self.base.new_record(buffer.split().freeze());
        if let Some(last) = self.base.current_record() {
            batch.meta = last.meta.clone();
            batch.context = last.context.clone();
        }
        *pending = 0;
        self.base.send_record(batch, output).await
    }
}

#[async_trait]
impl Task for JoinTask {
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

        let mut buffer = BytesMut::new();
        let mut pending = 0usize;
        loop {
            let record = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                record = self.base.get_record(&mut input) => record,
            };
            let Some(record) = record else {
                break;
            };

            if pending > 0 {
                buffer.put_slice(self.settings.delimiter.as_bytes());
            }
            buffer.put_slice(&record.data);
            pending += 1;

            if pending == self.settings.size {
                self.flush(&mut buffer, &mut pending, &output).await?;
            }
        }

        self.flush(&mut buffer, &mut pending, &output).await
    }

    fn base(&self) -> &BaseTask {
        &self.base
    }
}
