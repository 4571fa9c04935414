// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Arena-backed task graph built from a DAG expression.
//!
//! Nodes live in one `Vec` owned by the [`Graph`]; adjacency lists hold
//! indices into it, so a node can know both its upstream and downstream
//! neighbours without shared ownership. Each build interns names into a
//! fresh arena: every occurrence of a name within one expression maps to
//! the same node, and two builds never share nodes.

use std::collections::HashMap;

use crate::dag::ast::Expr;
use crate::errors::GraphError;
use crate::observability::messages::validation::{CyclicDependencyDetected, TaskNotFound};
use crate::observability::messages::StructuredLog;

/// Index of a node in its graph's arena.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    /// Nodes feeding this one, in the order edges were added.
    pub upstream: Vec<NodeId>,
    /// Nodes this one feeds, in the order edges were added.
    pub downstream: Vec<NodeId>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.upstream.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.downstream.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    terminals: Vec<NodeId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Grey,
    Black,
}

impl Graph {
    /// Resolves `expr` into a graph.
    ///
    /// `exists` reports whether a task of the given name is declared.
    /// Fails on the first unknown name, or when the edges form a cycle.
    pub fn build<F>(expr: &Expr, exists: F) -> Result<Self, GraphError>
    where
        F: Fn(&str) -> bool,
    {
        let mut graph = Graph::default();
        for name in expr.idents() {
            if !exists(name) {
                TaskNotFound { name }.log();
                return Err(GraphError::TaskNotFound(name.to_string()));
            }
            graph.intern(name);
        }

        graph.connect(expr);
        graph.terminals = expr
            .rightmost()
            .into_iter()
            .filter_map(|name| graph.index.get(name).copied())
            .collect();
        dedup_in_order(&mut graph.terminals);

        if let Some(cycle) = graph.find_cycle() {
            CyclicDependencyDetected { cycle: &cycle }.log();
            return Err(GraphError::CircularDependency { cycle });
        }
        Ok(graph)
    }

    fn intern(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_string(),
            upstream: Vec::new(),
            downstream: Vec::new(),
        });
        self.index.insert(name.to_string(), id);
        id
    }

    /// Adds the cartesian edges of every `>>` in `expr`.
    fn connect(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(_) => {}
            Expr::Tuple(items) => items.iter().for_each(|e| self.connect(e)),
            Expr::BinOp(left, right) => {
                self.connect(left);
                self.connect(right);
                for from in left.rightmost() {
                    for to in right.leftmost() {
                        if let (Some(&u), Some(&v)) = (self.index.get(from), self.index.get(to)) {
                            self.add_edge(u, v);
                        }
                    }
                }
            }
        }
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId) {
        if self.nodes[from].downstream.contains(&to) {
            return;
        }
        self.nodes[from].downstream.push(to);
        self.nodes[to].upstream.push(from);
    }

    /// Three-colour depth-first search over an explicit stack. Returns the
    /// first back edge found as a path that starts and ends on the same node.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut marks = vec![Mark::White; self.nodes.len()];
        // Grey nodes in visiting order, each with the next downstream to try.
        let mut stack: Vec<(NodeId, usize)> = Vec::new();

        for start in 0..self.nodes.len() {
            if marks[start] != Mark::White {
                continue;
            }
            marks[start] = Mark::Grey;
            stack.push((start, 0));

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                let next = self.nodes[node].downstream.get(top.1).copied();
                top.1 += 1;

                let Some(next) = next else {
                    stack.pop();
                    marks[node] = Mark::Black;
                    continue;
                };
                match marks[next] {
                    Mark::Grey => {
                        let from = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                        let mut cycle: Vec<String> = stack[from..]
                            .iter()
                            .map(|&(n, _)| self.nodes[n].name.clone())
                            .collect();
                        cycle.push(self.nodes[next].name.clone());
                        return Some(cycle);
                    }
                    Mark::White => {
                        marks[next] = Mark::Grey;
                        stack.push((next, 0));
                    }
                    Mark::Black => {}
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Nodes of the expression's rightmost boundary. Everything else is
    /// reachable upstream from them.
    pub fn terminals(&self) -> &[NodeId] {
        &self.terminals
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(|&id| self.nodes[id].is_root())
    }

    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(|&id| self.nodes[id].is_leaf())
    }

    /// Every edge as `(from, to)` names, sorted.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .nodes
            .iter()
            .flat_map(|node| {
                node.downstream
                    .iter()
                    .map(move |&to| (node.name.clone(), self.nodes[to].name.clone()))
            })
            .collect();
        edges.sort();
        edges
    }
}

fn dedup_in_order(ids: &mut Vec<NodeId>) {
    let mut seen = Vec::with_capacity(ids.len());
    ids.retain(|id| {
        if seen.contains(id) {
            false
        } else {
            seen.push(*id);
            true
        }
    });
}
