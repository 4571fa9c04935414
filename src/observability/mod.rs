// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging.
//!
//! Every diagnostic the engine emits is a message struct under [`messages`]
//! with a `Display` implementation for the human-readable text and a
//! [`messages::StructuredLog`] implementation that fixes its level and fields.
//! Call sites never format log strings themselves.
//!
//! # Usage
//!
//! ```rust
//! use streamdag::observability::messages::engine::TaskFailed;
//! use streamdag::observability::messages::StructuredLog;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
//! TaskFailed {
//!     task: "writer",
//!     error: &error,
//!     fatal: true,
//! }
//! .log();
//! ```

pub mod messages;
