// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Parsed form of a DAG expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(String),
    /// `left >> right`. Repeated `>>` nests to the left.
    BinOp(Box<Expr>, Box<Expr>),
    /// `[a, b, ...]` with at least two elements, kept in source order.
    Tuple(Vec<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn then(left: Expr, right: Expr) -> Self {
        Expr::BinOp(Box::new(left), Box::new(right))
    }

    /// Linear `a >> b >> c` over `names`; `None` when `names` is empty.
    pub fn chain<S: AsRef<str>>(names: &[S]) -> Option<Self> {
        let mut names = names.iter().map(|n| Expr::ident(n.as_ref()));
        let first = names.next()?;
        Some(names.fold(first, Expr::then))
    }

    /// Names this expression receives records into.
    pub fn leftmost(&self) -> Vec<&str> {
        match self {
            Expr::Ident(name) => vec![name.as_str()],
            Expr::BinOp(left, _) => left.leftmost(),
            Expr::Tuple(items) => items.iter().flat_map(|e| e.leftmost()).collect(),
        }
    }

    /// Names this expression emits records from.
    pub fn rightmost(&self) -> Vec<&str> {
        match self {
            Expr::Ident(name) => vec![name.as_str()],
            Expr::BinOp(_, right) => right.rightmost(),
            Expr::Tuple(items) => items.iter().flat_map(|e| e.rightmost()).collect(),
        }
    }

    /// Every referenced name, first occurrence first.
    pub fn idents(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_idents(&mut names);
        names
    }

    fn collect_idents<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Ident(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
            Expr::BinOp(left, right) => {
                left.collect_idents(names);
                right.collect_idents(names);
            }
            Expr::Tuple(items) => items.iter().for_each(|e| e.collect_idents(names)),
        }
    }

    /// Post-order flattening: operands before operators, tuples as `[n]`.
    ///
    /// `a >> [b, c]` flattens to `a b c [2] >>`.
    pub fn postfix(&self) -> String {
        let mut out = Vec::new();
        self.collect_postfix(&mut out);
        out.join(" ")
    }

    fn collect_postfix(&self, out: &mut Vec<String>) {
        match self {
            Expr::Ident(name) => out.push(name.clone()),
            Expr::BinOp(left, right) => {
                left.collect_postfix(out);
                right.collect_postfix(out);
                out.push(">>".to_string());
            }
            Expr::Tuple(items) => {
                items.iter().for_each(|e| e.collect_postfix(out));
                out.push(format!("[{}]", items.len()));
            }
        }
    }

    /// Rebuilds an expression from [`Expr::postfix`] output.
    pub fn from_postfix(text: &str) -> Option<Self> {
        let mut stack: Vec<Expr> = Vec::new();
        for token in text.split_whitespace() {
            if token == ">>" {
                let right = stack.pop()?;
                let left = stack.pop()?;
                stack.push(Expr::then(left, right));
            } else if let Some(count) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                let count: usize = count.parse().ok()?;
                if count < 2 || count > stack.len() {
                    return None;
                }
                let items = stack.split_off(stack.len() - count);
                stack.push(Expr::Tuple(items));
            } else {
                stack.push(Expr::ident(token));
            }
        }
        if stack.len() == 1 {
            stack.pop()
        } else {
            None
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::BinOp(left, right) => write!(f, "{} >> {}", left, right),
            Expr::Tuple(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}
