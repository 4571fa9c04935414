// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// Channel capacity used when `channel_size` is absent or not positive.
pub const DEFAULT_CHANNEL_SIZE: usize = 10_000;
/// Largest capacity a bounded tokio channel accepts.
pub const MAX_CHANNEL_SIZE: usize = tokio::sync::Semaphore::MAX_PERMITS;
/// Upper bound on a single secret lookup during load.
pub const DEFAULT_SECRET_TIMEOUT: Duration = Duration::from_secs(10);

/// Prefix of the deferred placeholder emitted by `{{ macro "NAME" }}`.
pub const MACRO_SENTINEL: &str = "___MACRO___";
/// Prefix of the deferred placeholder emitted by `{{ context "KEY" }}`.
pub const CONTEXT_SENTINEL: &str = "___CONTEXT___";
/// Terminator shared by both placeholder kinds.
pub const SENTINEL_SUFFIX: &str = "___";
