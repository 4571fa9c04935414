// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;        // documents, templating, secrets, runtime builder
pub mod dag;           // expression language + task graph
pub mod engine;        // scheduler, mux/demux
pub mod errors;        // error handling
pub mod observability;
pub mod query;         // enrichment query language
pub mod record;        // the unit of data
pub mod tasks;         // base task, registry, built-in tasks
pub mod traits;        // the Task contract
