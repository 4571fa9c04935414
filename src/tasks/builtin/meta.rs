// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use crate::config::{TaskConfig, Template};
use crate::errors::{ConfigError, TaskError};
use crate::tasks::{decode_settings, invalid_settings, BaseTask};
use crate::traits::{RecordReceiver, RecordSender, Task};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaSettings {
    #[serde(default)]
    pub values: BTreeMap<String, Template>,
}

/// Adds templated entries to each record's meta map.
///
/// Meta is append-only: keys already present on the record are kept.
pub struct MetaTask {
    base: BaseTask,
    settings: MetaSettings,
}

impl MetaTask {
    pub fn new(base: BaseTask, settings: MetaSettings) -> Self {
        Self { base, settings }
    }

    pub fn build(cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let settings: MetaSettings = decode_settings(cfg)?;
        if settings.values.is_empty() {
            return Err(invalid_settings(cfg, "values must not be empty"));
        }
        Ok(Box::new(Self::new(BaseTask::from_config(cfg)?, settings)))
    }
}

#[async_trait]
impl Task for MetaTask {
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

        loop {
            let record = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                record = self.base.get_record(&mut input) => record,
            };
            let Some(mut record) = record else {
                break;
            };

            for (key, template) in &self.settings.values {
                if record.meta.contains_key(key) {
                    continue;
                }
                let value = self.base.resolve(template)?;
                record.meta.insert(key.clone(), value);
            }
            self.base.send_record(record, &output).await?;
        }
        Ok(())
    }

    fn base(&self) -> &BaseTask {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use tokio::sync::mpsc;

    fn meta_task(values: &[(&str, &str)]) -> MetaTask {
        MetaTask::new(
            BaseTask::new("meta", "meta"),
            MetaSettings {
                values: values
                    .iter()
                    .map(|(k, v)| (k.to_string(), Template::new(*v)))
                    .collect(),
            },
        )
    }

    #[tokio::test]
    async fn test_appends_resolved_values() {
        let mut task = meta_task(&[("user", "___CONTEXT___who___"), ("kept", "new")]);
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);

        let mut record = Record::new(0, "up", "x");
        record.context.insert("who".to_string(), "\"alice\"".to_string());
        record.meta.insert("kept".to_string(), "old".to_string());
        in_tx.send(record).await.unwrap();
        drop(in_tx);

        task.run(Some(in_rx), Some(out_tx), CancellationToken::new())
            .await
            .unwrap();

        let out = out_rx.recv().await.unwrap();
        assert_eq!(out.meta.get("user").map(String::as_str), Some("alice"));
        assert_eq!(out.meta.get("kept").map(String::as_str), Some("old"));
    }

    #[tokio::test]
    async fn test_missing_context_fails() {
        let mut task = meta_task(&[("a", "___CONTEXT___x___-___CONTEXT___y___")]);
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, _out_rx) = mpsc::channel(4);
        in_tx.send(Record::new(0, "up", "x")).await.unwrap();
        drop(in_tx);

        let err = task
            .run(Some(in_rx), Some(out_tx), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "context keys were not set: x, y");
    }
}
