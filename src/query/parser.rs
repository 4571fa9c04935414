// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Tokeniser and recursive-descent parser for path queries.

use serde_json::Value;

use crate::errors::QueryError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stage {
    Literal(Value),
    Path { root: Root, segments: Vec<Segment> },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Root {
    Input,
    Var(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Field(String),
    Index(i64),
    Iterate,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Dot,
    Pipe,
    LBracket,
    RBracket,
    Var(String),
    Ident(String),
    Str(String),
    Num(f64),
}

fn parse_error(offset: usize, reason: impl Into<String>) -> QueryError {
    QueryError::Parse {
        offset,
        reason: reason.into(),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, QueryError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '.' => {
                tokens.push((Token::Dot, offset));
                i += 1;
            }
            '|' => {
                tokens.push((Token::Pipe, offset));
                i += 1;
            }
            '[' => {
                tokens.push((Token::LBracket, offset));
                i += 1;
            }
            ']' => {
                tokens.push((Token::RBracket, offset));
                i += 1;
            }
            '$' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end].1) {
                    end += 1;
                }
                if end == start || !is_ident_start(chars[start].1) {
                    return Err(parse_error(offset, "expected variable name after '$'"));
                }
                let name: String = chars[start..end].iter().map(|(_, c)| c).collect();
                tokens.push((Token::Var(name), offset));
                i = end;
            }
            '"' => {
                let mut text = String::new();
                let mut j = i + 1;
                let mut closed = false;
                while j < chars.len() {
                    match chars[j].1 {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' if j + 1 < chars.len() => {
                            let escaped = chars[j + 1].1;
                            text.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                other => other,
                            });
                            j += 2;
                        }
                        other => {
                            text.push(other);
                            j += 1;
                        }
                    }
                }
                if !closed {
                    return Err(parse_error(offset, "unterminated string literal"));
                }
                tokens.push((Token::Str(text), offset));
                i = j + 1;
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut j = i + 1;
                while j < chars.len() && (chars[j].1.is_ascii_digit() || chars[j].1 == '.') {
                    j += 1;
                }
                let literal: String = chars[i..j].iter().map(|(_, c)| c).collect();
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| parse_error(offset, format!("invalid number '{}'", literal)))?;
                tokens.push((Token::Num(number), offset));
                i = j;
            }
            c if is_ident_start(c) => {
                let mut j = i + 1;
                while j < chars.len() && is_ident_char(chars[j].1) {
                    j += 1;
                }
                let ident: String = chars[i..j].iter().map(|(_, c)| c).collect();
                tokens.push((Token::Ident(ident), offset));
                i = j;
            }
            other => {
                return Err(parse_error(offset, format!("unexpected character '{}'", other)));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, offset)| *offset)
            .unwrap_or(self.len)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn pipeline(&mut self) -> Result<Vec<Stage>, QueryError> {
        let mut stages = vec![self.stage()?];
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            stages.push(self.stage()?);
        }
        if self.pos < self.tokens.len() {
            return Err(parse_error(self.offset(), "unexpected trailing input"));
        }
        Ok(stages)
    }

    fn stage(&mut self) -> Result<Stage, QueryError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Str(text)) => Ok(Stage::Literal(Value::String(text))),
            Some(Token::Num(n)) => Ok(Stage::Literal(number_value(n))),
            Some(Token::Ident(ident)) => match ident.as_str() {
                "true" => Ok(Stage::Literal(Value::Bool(true))),
                "false" => Ok(Stage::Literal(Value::Bool(false))),
                "null" => Ok(Stage::Literal(Value::Null)),
                other => Err(parse_error(offset, format!("unknown identifier '{}'", other))),
            },
            Some(Token::Var(name)) => {
                let segments = self.segments()?;
                Ok(Stage::Path {
                    root: Root::Var(name),
                    segments,
                })
            }
            Some(Token::Dot) => {
                let mut segments = Vec::new();
                if let Some(first) = self.segment_after_dot()? {
                    segments.push(first);
                }
                segments.extend(self.segments()?);
                Ok(Stage::Path {
                    root: Root::Input,
                    segments,
                })
            }
            Some(_) => Err(parse_error(offset, "expected a path or literal")),
            None => Err(parse_error(offset, "unexpected end of query")),
        }
    }

    /// Segment directly following a `.`: a name, a quoted name, or a bracket.
    fn segment_after_dot(&mut self) -> Result<Option<Segment>, QueryError> {
        match self.peek() {
            Some(Token::Ident(_)) | Some(Token::Str(_)) => match self.advance() {
                Some(Token::Ident(name)) | Some(Token::Str(name)) => Ok(Some(Segment::Field(name))),
                _ => Ok(None),
            },
            Some(Token::LBracket) => {
                self.advance();
                self.bracket().map(Some)
            }
            _ => Ok(None),
        }
    }

    fn segments(&mut self) -> Result<Vec<Segment>, QueryError> {
        let mut segments = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    let offset = self.offset();
                    self.advance();
                    match self.segment_after_dot()? {
                        Some(segment) => segments.push(segment),
                        None => return Err(parse_error(offset, "expected field name after '.'")),
                    }
                }
                Some(Token::LBracket) => {
                    self.advance();
                    segments.push(self.bracket()?);
                }
                _ => return Ok(segments),
            }
        }
    }

    /// Parses the inside of `[...]`; the opening bracket is already consumed.
    fn bracket(&mut self) -> Result<Segment, QueryError> {
        let offset = self.offset();
        let segment = match self.advance() {
            Some(Token::RBracket) => return Ok(Segment::Iterate),
            Some(Token::Str(name)) => Segment::Field(name),
            Some(Token::Num(n)) if n.fract() == 0.0 => Segment::Index(n as i64),
            _ => return Err(parse_error(offset, "expected index, string or ']'")),
        };
        match self.advance() {
            Some(Token::RBracket) => Ok(segment),
            _ => Err(parse_error(self.offset(), "expected ']'")),
        }
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

pub(crate) fn parse(source: &str) -> Result<Vec<Stage>, QueryError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(parse_error(0, "empty query"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        len: source.len(),
    };
    parser.pipeline()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_paths() {
        let cases = vec![
            (".", vec![]),
            (".user", vec![Segment::Field("user".into())]),
            (
                ".a.b",
                vec![Segment::Field("a".into()), Segment::Field("b".into())],
            ),
            (
                ".items[0]",
                vec![Segment::Field("items".into()), Segment::Index(0)],
            ),
            (
                ".items[-1]",
                vec![Segment::Field("items".into()), Segment::Index(-1)],
            ),
            (".[]", vec![Segment::Iterate]),
            (
                ".\"odd key\".x",
                vec![Segment::Field("odd key".into()), Segment::Field("x".into())],
            ),
            (
                ".[\"k\"][]",
                vec![Segment::Field("k".into()), Segment::Iterate],
            ),
        ];

        for (source, expected) in cases {
            let stages = parse(source).unwrap();
            assert_eq!(
                stages,
                vec![Stage::Path {
                    root: Root::Input,
                    segments: expected
                }],
                "source: {}",
                source
            );
        }
    }

    #[test]
    fn test_parse_variables_literals_and_pipes() {
        let stages = parse("$meta.source | .").unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(
            stages[0],
            Stage::Path {
                root: Root::Var("meta".into()),
                segments: vec![Segment::Field("source".into())]
            }
        );

        assert_eq!(parse("\"x\"").unwrap(), vec![Stage::Literal(json!("x"))]);
        assert_eq!(parse("12").unwrap(), vec![Stage::Literal(json!(12))]);
        assert_eq!(parse("null").unwrap(), vec![Stage::Literal(Value::Null)]);
    }

    #[test]
    fn test_parse_rejections() {
        let cases = vec!["", ".a.", ".[1", ".a b", "| .", "$", ".a ? ", "\"open", "foo"];
        for source in cases {
            assert!(parse(source).is_err(), "expected error for {:?}", source);
        }
    }
}
