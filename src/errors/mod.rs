// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod graph;
mod pipeline;
mod task;

pub use config::ConfigError;
pub use graph::{GraphError, ParseError};
pub use pipeline::{PipelineError, TaskFailure};
pub use task::{QueryError, TaskError, TemplateError};
