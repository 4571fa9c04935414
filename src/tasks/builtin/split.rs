// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::TaskConfig;
use crate::errors::{ConfigError, TaskError};
use crate::tasks::{decode_settings, invalid_settings, BaseTask};
use crate::traits::{RecordReceiver, RecordSender, Task};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitSettings {
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default)]
    pub skip_empty: bool,
}

fn default_delimiter() -> String {
    "\n".to_string()
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            skip_empty: false,
        }
    }
}

/// Emits one record per delimited chunk of each input payload.
///
/// Chunks share the input buffer and inherit the parent's meta and context.
pub struct SplitTask {
    base: BaseTask,
    settings: SplitSettings,
}

impl SplitTask {
    pub fn new(base: BaseTask, settings: SplitSettings) -> Self {
        Self { base, settings }
    }

    pub fn build(cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let settings: SplitSettings = decode_settings(cfg)?;
        if settings.delimiter.is_empty() {
            return Err(invalid_settings(cfg, "delimiter must not be empty"));
        }
        Ok(Box::new(Self::new(BaseTask::from_config(cfg)?, settings)))
    }
}

/// Splits `data` on `delimiter` without copying.
pub(crate) fn split_bytes(data: &Bytes, delimiter: &[u8]) -> Vec<Bytes> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + delimiter.len() <= data.len() {
        if &data[i..i + delimiter.len()] == delimiter {
            chunks.push(data.slice(start..i));
            i += delimiter.len();
            start = i;
        } else {
            i += 1;
        }
    }
    chunks.push(data.slice(start..));
    chunks
}

#[async_trait]
impl Task for SplitTask {
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
            let Some(record) = record else {
                break;
            };

            for chunk in split_bytes(&record.data, self.settings.delimiter.as_bytes()) {
                if self.settings.skip_empty && chunk.is_empty() {
                    continue;
                }
                let mut child = self.base.new_record(chunk);
                child.meta = record.meta.clone();
                child.context = record.context.clone();
                self.base.send_record(child, &output).await?;
            }
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

    #[test]
    fn test_split_bytes() {
        let cases: Vec<(&str, &str, Vec<&str>)> = vec![
            ("a\nb\nc", "\n", vec!["a", "b", "c"]),
            ("a\n\nb\n", "\n", vec!["a", "", "b", ""]),
            ("one--two", "--", vec!["one", "two"]),
            ("nodelim", ",", vec!["nodelim"]),
            ("", ",", vec![""]),
        ];

        for (input, delimiter, expected) in cases {
            let data = Bytes::from(input.to_string());
            let chunks = split_bytes(&data, delimiter.as_bytes());
            let actual: Vec<&[u8]> = chunks.iter().map(|c| &c[..]).collect();
            let expected: Vec<&[u8]> = expected.iter().map(|e| e.as_bytes()).collect();
            assert_eq!(actual, expected, "input: {:?}", input);
        }
    }

    #[tokio::test]
    async fn test_split_inherits_context() {
        let mut task = SplitTask::new(
            BaseTask::new("split", "split"),
            SplitSettings {
                delimiter: ",".to_string(),
                skip_empty: true,
            },
        );
        let (in_tx, in_rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(8);

        let mut record = Record::new(0, "up", "x,,y");
        record.context.insert("k".to_string(), "v".to_string());
        in_tx.send(record).await.unwrap();
        drop(in_tx);

        task.run(Some(in_rx), Some(out_tx), CancellationToken::new())
            .await
            .unwrap();

        let mut chunks = Vec::new();
        while let Some(r) = out_rx.recv().await {
            assert_eq!(r.context.get("k").map(String::as_str), Some("v"));
            assert_eq!(r.origin, "split");
            chunks.push(r.data_lossy().to_string());
        }
        assert_eq!(chunks, vec!["x", "y"]);
    }
}
