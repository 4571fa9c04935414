// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod base;
pub mod builtin;
pub mod registry;
#[cfg(test)]
pub mod stub;

pub use base::BaseTask;
pub use registry::{decode_settings, invalid_settings, TaskConstructor, TaskRegistry};
