// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Embedded path-query language used for context enrichment.
//!
//! The language is a small jq-like subset:
//!
//! ```text
//! .                 identity
//! .user.name        object field access (missing fields yield null)
//! ."odd key"        quoted field
//! .items[0]         array index, negative counts from the end
//! .items[]          iterate array elements or object values
//! $meta.source      variable root
//! .a | .b           pipe every output of the left into the right
//! "text" 42 true    literals
//! ```
//!
//! A query yields zero, one or many values. The engine only depends on the
//! parse/execute contract exposed by [`Query`].
//!
//! # Example
//! ```
//! use streamdag::query::{Query, Variables};
//! use serde_json::json;
//!
//! let query = Query::parse(".user").unwrap();
//! let out = query.run(&json!({"user": "alice"}), &Variables::new()).unwrap();
//! assert_eq!(out, vec![json!("alice")]);
//! ```

mod parser;

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::QueryError;
use parser::{Root, Segment, Stage};

/// Named values reachable from a query as `$name`.
pub type Variables = BTreeMap<String, Value>;

/// A compiled query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    source: String,
    stages: Vec<Stage>,
}

impl Query {
    pub fn parse(source: &str) -> Result<Self, QueryError> {
        let stages = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            stages,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Executes the query against `input`, returning every produced value.
    pub fn run(&self, input: &Value, vars: &Variables) -> Result<Vec<Value>, QueryError> {
        let mut current = vec![input.clone()];
        for stage in &self.stages {
            let mut next = Vec::new();
            for value in &current {
                next.extend(run_stage(stage, value, vars)?);
            }
            current = next;
        }
        Ok(current)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn run_stage(stage: &Stage, input: &Value, vars: &Variables) -> Result<Vec<Value>, QueryError> {
    match stage {
        Stage::Literal(value) => Ok(vec![value.clone()]),
        Stage::Path { root, segments } => {
            let start = match root {
                Root::Input => input.clone(),
                Root::Var(name) => vars
                    .get(name)
                    .cloned()
                    .ok_or_else(|| QueryError::Execute(format!("${} is not defined", name)))?,
            };
            let mut values = vec![start];
            for segment in segments {
                let mut next = Vec::new();
                for value in values {
                    apply_segment(segment, value, &mut next)?;
                }
                values = next;
            }
            Ok(values)
        }
    }
}

fn apply_segment(segment: &Segment, value: Value, out: &mut Vec<Value>) -> Result<(), QueryError> {
    match (segment, value) {
        (Segment::Field(name), Value::Object(mut map)) => {
            out.push(map.remove(name).unwrap_or(Value::Null));
        }
        (Segment::Field(_), Value::Null) | (Segment::Index(_), Value::Null) => out.push(Value::Null),
        (Segment::Field(name), other) => {
            return Err(QueryError::Execute(format!(
                "cannot index {} with \"{}\"",
                type_name(&other),
                name
            )));
        }
        (Segment::Index(index), Value::Array(mut items)) => {
            let len = items.len() as i64;
            let position = if *index < 0 { len + index } else { *index };
            if (0..len).contains(&position) {
                out.push(items.swap_remove(position as usize));
            } else {
                out.push(Value::Null);
            }
        }
        (Segment::Index(index), other) => {
            return Err(QueryError::Execute(format!(
                "cannot index {} with number {}",
                type_name(&other),
                index
            )));
        }
        (Segment::Iterate, Value::Array(items)) => out.extend(items),
        (Segment::Iterate, Value::Object(map)) => out.extend(map.into_iter().map(|(_, v)| v)),
        (Segment::Iterate, other) => {
            return Err(QueryError::Execute(format!(
                "cannot iterate over {}",
                type_name(&other)
            )));
        }
    }
    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
