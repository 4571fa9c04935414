// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Recursive-descent parser for DAG expressions.
//!
//! ```text
//! expr := term ( ">>" term )*
//! term := IDENT | "[" expr ( "," expr )+ "]"
//! ```

use crate::dag::ast::Expr;
use crate::dag::lexer::{tokenize, Token};
use crate::errors::ParseError;

/// Deepest expression tree [`parse`] accepts.
pub const MAX_DEPTH: usize = 256;

/// Parses a DAG expression such as `src >> [a, b >> c] >> sink`.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        nesting: 0,
    };
    let (expr, _) = parser.expr()?;
    if let Some((token, offset)) = parser.tokens.get(parser.pos) {
        return Err(ParseError::UnexpectedToken {
            token: token.to_string(),
            offset: *offset,
            expected: "'>>' or end of expression",
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    /// Currently open brackets.
    nesting: usize,
}

fn check_depth(depth: usize, offset: usize) -> Result<usize, ParseError> {
    if depth > MAX_DEPTH {
        return Err(ParseError::TooDeep {
            offset,
            limit: MAX_DEPTH,
        });
    }
    Ok(depth)
}

impl Parser {
    fn next(&mut self, expected: &'static str) -> Result<(Token, usize), ParseError> {
        let next = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEnd { expected })?;
        self.pos += 1;
        Ok(next)
    }

    /// Returns the expression and the depth of its tree.
    fn expr(&mut self) -> Result<(Expr, usize), ParseError> {
        let (mut expr, mut depth) = self.term()?;
        while let Some((Token::Then, offset)) = self.tokens.get(self.pos) {
            let offset = *offset;
            self.pos += 1;
            let (right, right_depth) = self.term()?;
            depth = check_depth(1 + depth.max(right_depth), offset)?;
            expr = Expr::then(expr, right);
        }
        Ok((expr, depth))
    }

    fn term(&mut self) -> Result<(Expr, usize), ParseError> {
        const EXPECTED: &str = "task name or '['";
        match self.next(EXPECTED)? {
            (Token::Ident(name), _) => Ok((Expr::Ident(name), 1)),
            (Token::Open, open) => {
                // A list is at least one level above its deepest element.
                self.nesting += 1;
                check_depth(self.nesting + 1, open)?;

                let (first, mut depth) = self.expr()?;
                let mut items = vec![first];
                loop {
                    match self.next("',' or ']'")? {
                        (Token::Comma, _) => {
                            let (item, item_depth) = self.expr()?;
                            depth = depth.max(item_depth);
                            items.push(item);
                        }
                        (Token::Close, _) => break,
                        (token, offset) => {
                            return Err(ParseError::UnexpectedToken {
                                token: token.to_string(),
                                offset,
                                expected: "',' or ']'",
                            })
                        }
                    }
                }
                if items.len() < 2 {
                    return Err(ParseError::ListTooShort { offset: open });
                }
                self.nesting -= 1;
                Ok((Expr::Tuple(items), check_depth(depth + 1, open)?))
            }
            (token, offset) => Err(ParseError::UnexpectedToken {
                token: token.to_string(),
                offset,
                expected: EXPECTED,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Expr {
        Expr::ident(name)
    }

    #[test]
    fn test_parse_shapes() {
        struct TestCase {
            source: &'static str,
            expected: Expr,
        }

        let test_cases = vec![
            TestCase {
                source: "a",
                expected: id("a"),
            },
            TestCase {
                source: "a >> b >> c",
                expected: Expr::then(Expr::then(id("a"), id("b")), id("c")),
            },
            TestCase {
                source: "src >> [a, b]",
                expected: Expr::then(id("src"), Expr::Tuple(vec![id("a"), id("b")])),
            },
            TestCase {
                source: "[a, b] >> c",
                expected: Expr::then(Expr::Tuple(vec![id("a"), id("b")]), id("c")),
            },
            TestCase {
                source: "[a >> b, [c, d]]",
                expected: Expr::Tuple(vec![
                    Expr::then(id("a"), id("b")),
                    Expr::Tuple(vec![id("c"), id("d")]),
                ]),
            },
            TestCase {
                source: "\n\tx>>y ",
                expected: Expr::then(id("x"), id("y")),
            },
        ];

        for tc in test_cases {
            assert_eq!(parse(tc.source).unwrap(), tc.expected, "source: {}", tc.source);
        }
    }

    #[test]
    fn test_parse_rejections() {
        struct TestCase {
            source: &'static str,
            expected: ParseError,
        }

        let test_cases = vec![
            TestCase {
                source: "",
                expected: ParseError::Empty,
            },
            TestCase {
                source: "[]",
                expected: ParseError::UnexpectedToken {
                    token: "]".into(),
                    offset: 1,
                    expected: "task name or '['",
                },
            },
            TestCase {
                source: "[x]",
                expected: ParseError::ListTooShort { offset: 0 },
            },
            TestCase {
                source: "x >",
                expected: ParseError::UnexpectedCharacter { ch: '>', offset: 2 },
            },
            TestCase {
                source: "> x",
                expected: ParseError::UnexpectedCharacter { ch: '>', offset: 0 },
            },
            TestCase {
                source: "x, y",
                expected: ParseError::UnexpectedToken {
                    token: ",".into(),
                    offset: 1,
                    expected: "'>>' or end of expression",
                },
            },
            TestCase {
                source: "x,,y",
                expected: ParseError::UnexpectedToken {
                    token: ",".into(),
                    offset: 1,
                    expected: "'>>' or end of expression",
                },
            },
            TestCase {
                source: "[x,]",
                expected: ParseError::UnexpectedToken {
                    token: "]".into(),
                    offset: 3,
                    expected: "task name or '['",
                },
            },
            TestCase {
                source: "[,x]",
                expected: ParseError::UnexpectedToken {
                    token: ",".into(),
                    offset: 1,
                    expected: "task name or '['",
                },
            },
            TestCase {
                source: "((x))",
                expected: ParseError::UnexpectedCharacter { ch: '(', offset: 0 },
            },
            TestCase {
                source: "{x,y}",
                expected: ParseError::UnexpectedCharacter { ch: '{', offset: 0 },
            },
            TestCase {
                source: "[a, b",
                expected: ParseError::UnexpectedEnd {
                    expected: "',' or ']'",
                },
            },
            TestCase {
                source: "a >>",
                expected: ParseError::UnexpectedEnd {
                    expected: "task name or '['",
                },
            },
            TestCase {
                source: "a b",
                expected: ParseError::UnexpectedToken {
                    token: "b".into(),
                    offset: 2,
                    expected: "'>>' or end of expression",
                },
            },
        ];

        for tc in test_cases {
            assert_eq!(parse(tc.source), Err(tc.expected), "source: {:?}", tc.source);
        }
    }

    #[test]
    fn test_unexpected_character_message() {
        let err = parse("a >> b;").unwrap_err();
        assert_eq!(err.to_string(), "unexpected character ';' at offset 6");
    }

    #[test]
    fn test_display_and_postfix_round_trip() {
        let sources = [
            "a",
            "a >> b >> c",
            "src >> [a, b] >> sink",
            "[a >> b, [c, d]] >> e",
        ];

        for source in sources {
            let expr = parse(source).unwrap();
            assert_eq!(parse(&expr.to_string()).unwrap(), expr, "display: {}", source);
            assert_eq!(
                Expr::from_postfix(&expr.postfix()),
                Some(expr.clone()),
                "postfix: {}",
                source
            );
        }
        assert_eq!(parse("a >> [b, c]").unwrap().postfix(), "a b c [2] >>");
    }

    #[test]
    fn test_boundaries() {
        let expr = parse("[a, b >> c] >> [d, e] >> f").unwrap();
        assert_eq!(expr.leftmost(), vec!["a", "b"]);
        assert_eq!(expr.rightmost(), vec!["f"]);

        let inner = parse("[a, b >> c]").unwrap();
        assert_eq!(inner.rightmost(), vec!["a", "c"]);
        assert_eq!(expr.idents(), vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_chain() {
        assert_eq!(Expr::chain::<&str>(&[]), None);
        assert_eq!(Expr::chain(&["a"]), Some(id("a")));
        assert_eq!(Expr::chain(&["a", "b", "c"]), Some(parse("a >> b >> c").unwrap()));
    }

    #[test]
    fn test_depth_limit() {
        let names: Vec<String> = (0..=MAX_DEPTH).map(|i| format!("t{}", i)).collect();
        let at_limit = names[..MAX_DEPTH].join(" >> ");
        assert!(parse(&at_limit).is_ok());

        let over_limit = names.join(" >> ");
        let err = parse(&over_limit).unwrap_err();
        assert!(matches!(err, ParseError::TooDeep { limit: MAX_DEPTH, .. }));

        let nested = "[".repeat(200_000);
        assert_eq!(
            parse(&nested).unwrap_err(),
            ParseError::TooDeep {
                offset: MAX_DEPTH - 1,
                limit: MAX_DEPTH
            }
        );

        let mut deepest_list = String::from("a");
        for _ in 0..MAX_DEPTH - 1 {
            deepest_list = format!("[{}, z]", deepest_list);
        }
        assert!(parse(&deepest_list).is_ok());
        let too_deep_list = format!("[{}, z]", deepest_list);
        assert!(matches!(
            parse(&too_deep_list).unwrap_err(),
            ParseError::TooDeep { offset, .. } if offset == MAX_DEPTH - 1
        ));
    }
}
