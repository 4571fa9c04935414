// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Shared state and helpers embedded by every task.
//!
//! `BaseTask` owns the task's identity, its accounting counters, the most
//! recently received record and the compiled context-enrichment rules. Tasks
//! hold one by value and route all channel traffic through it so that
//! counting, record ids and enrichment behave identically everywhere.

use bytes::Bytes;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{Template, TaskConfig};
use crate::errors::{ConfigError, TaskError, TemplateError};
use crate::observability::messages::task::{EnrichmentEmpty, EnrichmentFailed};
use crate::observability::messages::StructuredLog;
use crate::query::{Query, Variables};
use crate::record::Record;
use crate::traits::{RecordReceiver, RecordSender};

#[derive(Debug)]
pub struct BaseTask {
    name: String,
    task_type: String,
    fail_on_error: bool,
    context_rules: Vec<(String, Query)>,
    input_count: AtomicU64,
    record_index: AtomicU64,
    current_record: Option<Record>,
}

impl BaseTask {
    pub fn new(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            task_type: task_type.into(),
            fail_on_error: false,
            context_rules: Vec::new(),
            input_count: AtomicU64::new(0),
            record_index: AtomicU64::new(0),
            current_record: None,
        }
    }

    /// Builds the base from the common task keys, compiling context rules.
    pub fn from_config(cfg: &TaskConfig) -> Result<Self, ConfigError> {
        let mut base = Self::new(cfg.name.clone(), cfg.task_type.clone())
            .with_fail_on_error(cfg.fail_on_error);
        for (key, source) in &cfg.context {
            let query = Query::parse(source).map_err(|e| ConfigError::InvalidContextRule {
                name: cfg.name.clone(),
                key: key.clone(),
                reason: e.to_string(),
            })?;
            base.context_rules.push((key.clone(), query));
        }
        Ok(base)
    }

    pub fn with_fail_on_error(mut self, fail_on_error: bool) -> Self {
        self.fail_on_error = fail_on_error;
        self
    }

    pub fn with_context_rule(mut self, key: impl Into<String>, query: Query) -> Self {
        self.context_rules.push((key.into(), query));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    pub fn context_rule_count(&self) -> usize {
        self.context_rules.len()
    }

    pub fn input_count(&self) -> u64 {
        self.input_count.load(Ordering::Relaxed)
    }

    /// The record most recently returned by [`BaseTask::get_record`].
    pub fn current_record(&self) -> Option<&Record> {
        self.current_record.as_ref()
    }

    /// Receives the next record, or `None` once the input is closed.
    pub async fn get_record(&mut self, input: &mut RecordReceiver) -> Option<Record> {
        let record = input.recv().await?;
        self.input_count.fetch_add(1, Ordering::Relaxed);
        self.current_record = Some(record.clone());
        Some(record)
    }

    /// Resolves a template against the current record, if any.
    pub fn resolve(&self, template: &Template) -> Result<String, TemplateError> {
        template.resolve(self.current_record.as_ref())
    }

    /// Creates a record owned by this task with the next id.
    pub fn new_record(&self, data: impl Into<Bytes>) -> Record {
        let id = self.record_index.fetch_add(1, Ordering::Relaxed);
        Record::new(id, self.name.clone(), data)
    }

    /// Wraps `data` in a new record and sends it.
    pub async fn send_data(
        &self,
        data: impl Into<Bytes>,
        output: &RecordSender,
    ) -> Result<(), TaskError> {
        let record = self.new_record(data);
        self.send_record(record, output).await
    }

    /// Enriches `record` and writes it downstream.
    pub async fn send_record(&self, mut record: Record, output: &RecordSender) -> Result<(), TaskError> {
        self.enrich(&mut record);
        output
            .send(record)
            .await
            .map_err(|_| TaskError::DownstreamClosed)
    }

    /// Applies every context rule to `record`.
    ///
    /// All rules see the record as it was before this call. Failures are
    /// logged and leave that key untouched.
    pub fn enrich(&self, record: &mut Record) {
        if self.context_rules.is_empty() {
            return;
        }

        let input = record.data_json();
        let mut vars = Variables::new();
        vars.insert("meta".to_string(), serde_json::json!(record.meta));
        vars.insert("context".to_string(), serde_json::json!(record.context));
        vars.insert("record".to_string(), record.snapshot());

        let mut updates = Vec::with_capacity(self.context_rules.len());
        for (key, query) in &self.context_rules {
            let values = match query.run(&input, &vars) {
                Ok(values) => values,
                Err(e) => {
                    EnrichmentFailed {
                        task: &self.name,
                        key,
                        record_id: record.id,
                        error: &e,
                    }
                    .log();
                    continue;
                }
            };

            let value = match values.len() {
                0 => {
                    EnrichmentEmpty {
                        task: &self.name,
                        key,
                        record_id: record.id,
                    }
                    .log();
                    continue;
                }
                1 => values.into_iter().next().unwrap_or(Value::Null),
                _ => Value::Array(values),
            };

            match serde_json::to_string(&value) {
                Ok(encoded) => updates.push((key.clone(), encoded)),
                Err(e) => EnrichmentFailed {
                    task: &self.name,
                    key,
                    record_id: record.id,
                    error: &e,
                }
                .log(),
            }
        }

        record.context.extend(updates);
    }

    pub fn require_no_input(&self, input: &Option<RecordReceiver>) -> Result<(), TaskError> {
        if input.is_some() {
            return Err(self.invalid_channels("is a source and cannot have an input"));
        }
        Ok(())
    }

    pub fn require_no_output(&self, output: &Option<RecordSender>) -> Result<(), TaskError> {
        if output.is_some() {
            return Err(self.invalid_channels("is a sink and cannot have an output"));
        }
        Ok(())
    }

    pub fn require_input(&self, input: &Option<RecordReceiver>) -> Result<(), TaskError> {
        if input.is_none() {
            return Err(self.invalid_channels("requires an input"));
        }
        Ok(())
    }

    pub fn require_output(&self, output: &Option<RecordSender>) -> Result<(), TaskError> {
        if output.is_none() {
            return Err(self.invalid_channels("requires an output"));
        }
        Ok(())
    }

    fn invalid_channels(&self, reason: &'static str) -> TaskError {
        TaskError::InvalidChannels {
            name: self.name.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn enriching_base(rules: &[(&str, &str)]) -> BaseTask {
        let mut cfg = TaskConfig::new("tagger", "echo");
        for (key, query) in rules {
            cfg = cfg.with_context_rule(key, query);
        }
        BaseTask::from_config(&cfg).unwrap()
    }

    #[tokio::test]
    async fn test_send_data_assigns_ids_and_origin() {
        let base = BaseTask::new("src", "static");
        let (tx, mut rx) = mpsc::channel(4);

        base.send_data("a", &tx).await.unwrap();
        base.send_data("b", &tx).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((first.id, first.origin.as_str()), (0, "src"));
        assert_eq!((second.id, &second.data[..]), (1, &b"b"[..]));
    }

    #[tokio::test]
    async fn test_get_record_counts_and_tracks_current() {
        let mut base = BaseTask::new("sink", "collect");
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(Record::new(5, "up", "x")).await.unwrap();
        drop(tx);

        assert!(base.current_record().is_none());
        let record = base.get_record(&mut rx).await.unwrap();
        assert_eq!(record.id, 5);
        assert_eq!(base.input_count(), 1);
        assert_eq!(base.current_record().map(|r| r.id), Some(5));
        assert!(base.get_record(&mut rx).await.is_none());
        assert_eq!(base.input_count(), 1);
    }

    #[tokio::test]
    async fn test_send_to_closed_channel() {
        let base = BaseTask::new("src", "static");
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = base.send_data("a", &tx).await.unwrap_err();
        assert!(matches!(err, TaskError::DownstreamClosed));
    }

    #[test]
    fn test_enrich_sets_json_encoded_values() {
        let base = enriching_base(&[("who", ".user"), ("tags", ".tags[]"), ("age", ".age")]);
        let mut record = Record::new(0, "src", r#"{"user":"alice","tags":["x","y"],"age":30}"#);

        base.enrich(&mut record);

        assert_eq!(record.context.get("who").map(String::as_str), Some("\"alice\""));
        assert_eq!(record.context_value("who"), Some("alice"));
        assert_eq!(record.context.get("tags").map(String::as_str), Some("[\"x\",\"y\"]"));
        assert_eq!(record.context.get("age").map(String::as_str), Some("30"));
    }

    #[test]
    fn test_enrich_failure_drops_only_that_key() {
        let base = enriching_base(&[("bad", ".user.name"), ("good", ".user"), ("none", ".xs[]")]);
        let mut record = Record::new(0, "src", r#"{"user":"alice","xs":[]}"#);

        base.enrich(&mut record);

        assert!(!record.context.contains_key("bad"));
        assert!(!record.context.contains_key("none"));
        assert_eq!(record.context_value("good"), Some("alice"));
    }

    #[test]
    fn test_enrich_sees_record_as_it_arrived() {
        let base = enriching_base(&[("a", "\"first\""), ("b", "$context.a")]);
        let mut record = Record::new(0, "src", "{}");

        base.enrich(&mut record);

        assert_eq!(record.context.get("a").map(String::as_str), Some("\"first\""));
        assert_eq!(record.context.get("b").map(String::as_str), Some("null"));
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let base = enriching_base(&[("who", ".user"), ("origin", "$record.origin")]);
        let mut record = Record::new(3, "src", r#"{"user":"bob"}"#);

        base.enrich(&mut record);
        let first = record.context.clone();
        base.enrich(&mut record);

        assert_eq!(record.context, first);
    }

    #[test]
    fn test_invalid_context_rule_fails_construction() {
        let cfg = TaskConfig::new("t", "echo").with_context_rule("k", ".a[");
        let err = BaseTask::from_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidContextRule { key, .. } if key == "k"));
    }

    #[test]
    fn test_channel_requirements() {
        let base = BaseTask::new("t", "echo");
        let (tx, rx) = mpsc::channel::<Record>(1);
        let input = Some(rx);
        let output = Some(tx);

        assert!(base.require_no_input(&input).is_err());
        assert!(base.require_no_output(&output).is_err());
        assert!(base.require_input(&None).is_err());
        assert!(base.require_output(&None).is_err());
        assert!(base.require_input(&input).is_ok());
        assert!(base.require_output(&output).is_ok());
    }
}
