// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod task;

pub use task::{RecordReceiver, RecordSender, Task};
