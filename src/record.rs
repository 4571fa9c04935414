// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The unit of data flowing between tasks.
//!
//! A [`Record`] is owned by exactly one task at a time: the task that received
//! it from its input channel (or created it, for sources). Once a record is sent
//! it belongs to the receiver. Fan-out clones the record; `data` is a shared
//! [`Bytes`] buffer so only the small `meta` and `context` maps are copied.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Free-form string metadata carried with a record. Tasks only add keys.
pub type Meta = BTreeMap<String, String>;

/// Per-record key/value bag written by upstream context enrichment.
///
/// This is unrelated to the pipeline cancellation token.
pub type Context = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    /// Monotonically increasing within the producing task.
    pub id: u64,
    /// Name of the producing task.
    pub origin: String,
    pub data: Bytes,
    pub meta: Meta,
    pub context: Context,
}

impl Record {
    pub fn new(id: u64, origin: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            origin: origin.into(),
            data: data.into(),
            meta: Meta::new(),
            context: Context::new(),
        }
    }

    /// Payload as UTF-8 text, replacing invalid sequences.
    pub fn data_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Context value with one pair of surrounding JSON quotes removed.
    ///
    /// Enrichment stores query results in their JSON encoding, so a string
    /// result `alice` is held as `"alice"`. Readers want the bare text.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(|v| strip_json_quotes(v))
    }

    /// Payload as a JSON value.
    ///
    /// Valid JSON payloads are parsed; other UTF-8 payloads become a JSON
    /// string; binary payloads become a base64 string.
    pub fn data_json(&self) -> Value {
        if let Ok(value) = serde_json::from_slice::<Value>(&self.data) {
            return value;
        }
        match std::str::from_utf8(&self.data) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => Value::String(BASE64.encode(&self.data)),
        }
    }

    /// Full JSON view of the record used as `$record` in enrichment queries.
    pub fn snapshot(&self) -> Value {
        json!({
            "id": self.id,
            "origin": self.origin,
            "data": self.data_json(),
            "meta": self.meta,
            "context": self.context,
        })
    }
}

/// Removes exactly one leading and one trailing `"` when both are present.
pub fn strip_json_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
