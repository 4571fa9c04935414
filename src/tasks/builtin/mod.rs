// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process tasks that ship with the engine.
//!
//! | type     | shape               | purpose                                  |
//! |----------|---------------------|------------------------------------------|
//! | `static` | source              | emit configured items                    |
//! | `file`   | source or sink      | read lines/whole file, or write records  |
//! | `echo`   | transform or sink   | log payloads                             |
//! | `split`  | transform           | one record per delimited chunk           |
//! | `join`   | transform           | batch records into one payload           |
//! | `delay`  | transform           | sleep before forwarding each record      |
//! | `meta`   | transform           | append templated meta values             |

pub mod delay;
pub mod echo;
pub mod file;
pub mod join;
pub mod meta;
pub mod split;
pub mod static_source;

pub use delay::DelayTask;
pub use echo::EchoTask;
pub use file::FileTask;
pub use join::JoinTask;
pub use meta::MetaTask;
pub use split::SplitTask;
pub use static_source::StaticTask;

use crate::tasks::TaskRegistry;

pub(crate) fn register_all(registry: &mut TaskRegistry) {
    registry.register("static", StaticTask::build);
    registry.register("file", FileTask::build);
    registry.register("echo", EchoTask::build);
    registry.register("split", SplitTask::build);
    registry.register("join", JoinTask::build);
    registry.register("delay", DelayTask::build);
    registry.register("meta", MetaTask::build);
}
