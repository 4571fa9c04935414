// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! DAG expression language and the task graph it describes.
//!
//! `src >> [a, b] >> sink` wires `src` into both `a` and `b`, and both into
//! `sink`. [`parse`] turns the text into an [`Expr`]; [`Graph::build`]
//! resolves names, adds edges and rejects cycles.

mod ast;
mod graph;
mod lexer;
mod parser;

pub use ast::Expr;
pub use graph::{Graph, Node, NodeId};
pub use parser::{parse, MAX_DEPTH};
