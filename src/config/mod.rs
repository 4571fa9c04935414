// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod consts;
mod loader;
mod runtime;
pub mod secrets;
mod template;


pub use loader::{load_config, Config, ConfigLoader, TaskConfig};
pub use runtime::RuntimeBuilder;
pub use secrets::{FileSecretStore, MemorySecretStore, NoSecretStore, SecretStore};
pub use template::{MacroKind, Template};
