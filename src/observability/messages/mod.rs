// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `engine` - pipeline and task lifecycle, mux/demux events
//! * `task` - per-record events inside tasks (enrichment, echo)
//! * `validation` - graph and configuration problems found at load

use tracing::Span;

pub mod engine;
pub mod task;
pub mod validation;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emits the message as a tracing event.
    fn log(&self);

    /// Creates a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
