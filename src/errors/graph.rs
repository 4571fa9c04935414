// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors for DAG expression parsing and graph construction.

use thiserror::Error;

/// Lexing or parsing failure in a DAG expression.
///
/// `offset` is the byte position in the source expression where the problem
/// was detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },

    #[error("unexpected token '{token}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        token: String,
        offset: usize,
        expected: &'static str,
    },

    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("list at offset {offset} must contain at least two elements")]
    ListTooShort { offset: usize },

    /// The expression tree would be deeper than `limit` levels. Counts both
    /// bracket nesting and chained `>>` operators.
    #[error("expression nests deeper than {limit} levels at offset {offset}")]
    TooDeep { offset: usize, limit: usize },

    #[error("empty expression")]
    Empty,
}

/// Failure resolving an expression into a task graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An identifier in the expression names no declared task.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The resolved graph contains a back edge. `cycle` starts and ends on the
    /// same node.
    #[error("circular dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
}
