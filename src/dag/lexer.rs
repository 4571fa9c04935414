// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::errors::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Ident(String),
    /// `>>`
    Then,
    Open,
    Close,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{}", name),
            Token::Then => write!(f, ">>"),
            Token::Open => write!(f, "["),
            Token::Close => write!(f, "]"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Splits an expression into tokens paired with their byte offsets.
pub(crate) fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'[' => {
                tokens.push((Token::Open, i));
                i += 1;
            }
            b']' => {
                tokens.push((Token::Close, i));
                i += 1;
            }
            b',' => {
                tokens.push((Token::Comma, i));
                i += 1;
            }
            b'>' if bytes.get(i + 1) == Some(&b'>') => {
                tokens.push((Token::Then, i));
                i += 2;
            }
            b if is_ident_start(b) => {
                let start = i;
                while i < bytes.len() && is_ident_char(bytes[i]) {
                    i += 1;
                }
                tokens.push((Token::Ident(source[start..i].to_string()), start));
            }
            _ => {
                let ch = source[i..].chars().next().unwrap_or('\u{FFFD}');
                return Err(ParseError::UnexpectedCharacter { ch, offset: i });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("src >> [a_1,\tb]\n").unwrap();
        assert_eq!(
            tokens,
            vec![
                (Token::Ident("src".into()), 0),
                (Token::Then, 4),
                (Token::Open, 7),
                (Token::Ident("a_1".into()), 8),
                (Token::Comma, 11),
                (Token::Ident("b".into()), 13),
                (Token::Close, 14),
            ]
        );
    }

    #[test]
    fn test_tokenize_rejections() {
        let cases = vec![
            ("x >", '>', 2),
            ("> x", '>', 0),
            ("((x))", '(', 0),
            ("{x,y}", '{', 0),
            ("a >> 9b", '9', 5),
            ("a-b", '-', 1),
            ("é", 'é', 0),
        ];

        for (source, ch, offset) in cases {
            assert_eq!(
                tokenize(source),
                Err(ParseError::UnexpectedCharacter { ch, offset }),
                "source: {:?}",
                source
            );
        }
    }
}
