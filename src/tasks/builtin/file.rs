// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Local file source and sink.
//!
//! The shape is taken from the wiring: with only an output the task reads
//! `path` and emits its contents, with only an input it writes every record
//! to `path`. As a sink, `path` is resolved per record, so
//! `out/{{ context "day" }}.log` fans records out over several files. At most
//! `max_open` of those files are held open; the least recently written one is
//! flushed and closed to make room, and reopened in append mode if it shows
//! up again.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio_util::sync::CancellationToken;

use crate::config::{TaskConfig, Template};
use crate::errors::{ConfigError, TaskError};
use crate::tasks::{decode_settings, invalid_settings, BaseTask};
use crate::traits::{RecordReceiver, RecordSender, Task};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// One record per line; sinks terminate each record with a newline.
    #[default]
    Lines,
    /// The whole file is one record; sinks write payloads back to back.
    Whole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    pub path: Template,
    #[serde(default)]
    pub mode: FileMode,
    /// Sinks only: keep existing content instead of truncating.
    #[serde(default)]
    pub append: bool,
    /// Sinks only: open file handles kept between records.
    #[serde(default = "default_max_open")]
    pub max_open: usize,
}

fn default_max_open() -> usize {
    32
}

pub struct FileTask {
    base: BaseTask,
    settings: FileSettings,
}

impl FileTask {
    pub fn new(base: BaseTask, settings: FileSettings) -> Self {
        Self { base, settings }
    }

    pub fn build(cfg: &TaskConfig) -> Result<Box<dyn Task>, ConfigError> {
        let settings: FileSettings = decode_settings(cfg)?;
        if settings.path.raw().trim().is_empty() {
            return Err(invalid_settings(cfg, "path must not be empty"));
        }
        if settings.max_open == 0 {
            return Err(invalid_settings(cfg, "max_open must be greater than zero"));
        }
        Ok(Box::new(Self::new(BaseTask::from_config(cfg)?, settings)))
    }

    async fn read(&self, output: RecordSender, cancel: CancellationToken) -> Result<(), TaskError> {
        let path = self.base.resolve(&self.settings.path)?;
        let file = File::open(&path).await?;

        match self.settings.mode {
            FileMode::Whole => {
                let mut data = Vec::new();
                BufReader::new(file).read_to_end(&mut data).await?;
                tokio::select! {
                    _ = cancel.cancelled() => Ok(()),
                    sent = self.base.send_data(data, &output) => sent,
                }
            }
            FileMode::Lines => {
                let mut lines = BufReader::new(file).lines();
                loop {
                    let line = tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        line = lines.next_line() => line?,
                    };
                    let Some(line) = line else {
                        return Ok(());
                    };
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        sent = self.base.send_data(line, &output) => sent?,
                    }
                }
            }
        }
    }

    async fn write(
        &mut self,
        mut input: RecordReceiver,
        cancel: CancellationToken,
    ) -> Result<(), TaskError> {
        let mut writers = WriterCache::new(self.settings.max_open, self.settings.append);

        let result = loop {
            let record = tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                record = self.base.get_record(&mut input) => record,
            };
            let Some(record) = record else {
                break Ok(());
            };

            let path = match self.base.resolve(&self.settings.path) {
                Ok(path) => path,
                Err(e) => break Err(e.into()),
            };
            if let Err(e) = self.write_record(&mut writers, path, &record.data).await {
                break Err(e);
            }
        };

        writers.flush_all().await?;
        result
    }

    async fn write_record(
        &self,
        writers: &mut WriterCache,
        path: String,
        data: &[u8],
    ) -> Result<(), TaskError> {
        let writer = writers.get(path).await?;
        writer.write_all(data).await?;
        if self.settings.mode == FileMode::Lines {
            writer.write_all(b"\n").await?;
        }
        Ok(())
    }
}

/// Open sink files keyed by resolved path, bounded to `capacity` handles.
struct WriterCache {
    open: HashMap<String, BufWriter<File>>,
    /// Least recently written first.
    order: VecDeque<String>,
    /// Every path opened during this run; reopening one must not truncate it.
    opened: HashSet<String>,
    capacity: usize,
    append: bool,
}

impl WriterCache {
    fn new(capacity: usize, append: bool) -> Self {
        Self {
            open: HashMap::new(),
            order: VecDeque::new(),
            opened: HashSet::new(),
            capacity: capacity.max(1),
            append,
        }
    }

    async fn get(&mut self, path: String) -> Result<&mut BufWriter<File>, TaskError> {
        if !self.open.contains_key(&path) && self.open.len() >= self.capacity {
            self.close_oldest().await?;
        }

        if let Some(position) = self.order.iter().position(|p| *p == path) {
            self.order.remove(position);
        }
        self.order.push_back(path.clone());

        match self.open.entry(path) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let append = self.append || !self.opened.insert(entry.key().clone());
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(append)
                    .truncate(!append)
                    .open(entry.key())
                    .await?;
                Ok(entry.insert(BufWriter::new(file)))
            }
        }
    }

    async fn close_oldest(&mut self) -> Result<(), TaskError> {
        while let Some(path) = self.order.pop_front() {
            if let Some(mut writer) = self.open.remove(&path) {
                writer.flush().await?;
                return Ok(());
            }
        }
        Ok(())
    }

    async fn flush_all(&mut self) -> Result<(), TaskError> {
        for writer in self.open.values_mut() {
            writer.flush().await?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn open_count(&self) -> usize {
        self.open.len()
    }
}

#[async_trait]
impl Task for FileTask {
    async fn run(
        &mut self,
        input: Option<RecordReceiver>,
        output: Option<RecordSender>,
        cancel: CancellationToken,
    ) -> Result<(), TaskError> {
        match (input, output) {
            (None, Some(output)) => self.read(output, cancel).await,
            (Some(input), None) => self.write(input, cancel).await,
            (Some(_), Some(_)) => Err(TaskError::InvalidChannels {
                name: self.base.name().to_string(),
                reason: "cannot have both an input and an output",
            }),
            (None, None) => Err(TaskError::InvalidChannels {
                name: self.base.name().to_string(),
                reason: "requires an input or an output",
            }),
        }
    }

    fn base(&self) -> &BaseTask {
        &self.base
    }
}
