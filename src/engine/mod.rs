// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runs a task graph: channel provisioning, fan-out and fan-in coordinators,
//! per-task scheduling units and failure aggregation.

mod demux;
mod mux;
pub mod pipeline;


pub use pipeline::{Pipeline, RunSummary};
