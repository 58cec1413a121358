//! Lexer for the source language.
//!
//! The lexer is line-oriented: `#` comments and blank lines are dropped,
//! leading spaces become `Indent`/`Dedent` tokens via an indentation stack
//! (so the parser sees block structure as plain tokens), and every token
//! carries its 1-based source line. Line numbers matter beyond diagnostics:
//! control statements derive their jump labels from them.

use core::fmt;

use crate::error::CompileError;

/// Kind of a token, carrying literal values where the parser needs them.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Identifiers and literals
    Ident(String),
    Int(i32),
    Float(f64),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Lt,
    Le,
    Gt,
    Ge,
    Equal,

    // Punctuation
    LParen,
    RParen,
    Comma,
    Colon,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,

    // Keywords
    If,
    While,
    For,
    In,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier '{name}'"),
            TokenKind::Int(value) => write!(f, "integer literal {value}"),
            TokenKind::Float(value) => write!(f, "float literal {value}"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::Equal => write!(f, "'='"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::While => write!(f, "'while'"),
            TokenKind::For => write!(f, "'for'"),
            TokenKind::In => write!(f, "'in'"),
        }
    }
}

/// A single token with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

/// Lex a source string into tokens.
pub fn lex(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut tokens = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut last_line = 0u32;

    for (index, raw) in source.lines().enumerate() {
        let line = index as u32 + 1;
        last_line = line;

        let text = match raw.find('#') {
            Some(pos) => &raw[..pos],
            None => raw,
        };
        if text.trim().is_empty() {
            continue;
        }

        let stripped = text.trim_start_matches(' ');
        if stripped.starts_with('\t') {
            return Err(CompileError::syntax(line, "tabs are not allowed in indentation"));
        }
        let indent = text.len() - stripped.len();

        let current = *indents.last().unwrap_or(&0);
        if indent > current {
            indents.push(indent);
            tokens.push(Token {
                kind: TokenKind::Indent,
                line,
            });
        } else if indent < current {
            while indent < *indents.last().unwrap_or(&0) {
                indents.pop();
                tokens.push(Token {
                    kind: TokenKind::Dedent,
                    line,
                });
            }
            if indent != *indents.last().unwrap_or(&0) {
                return Err(CompileError::syntax(
                    line,
                    "unindent does not match any outer indentation level",
                ));
            }
        }

        let mut lexer = Lexer {
            bytes: stripped.as_bytes(),
            text: stripped,
            index: 0,
            line,
        };
        lexer.run(&mut tokens)?;
        tokens.push(Token {
            kind: TokenKind::Newline,
            line,
        });
    }

    while indents.len() > 1 {
        indents.pop();
        tokens.push(Token {
            kind: TokenKind::Dedent,
            line: last_line,
        });
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        line: last_line,
    });
    Ok(tokens)
}

struct Lexer<'src> {
    bytes: &'src [u8],
    text: &'src str,
    index: usize,
    line: u32,
}

impl<'src> Lexer<'src> {
    fn run(&mut self, tokens: &mut Vec<Token>) -> Result<(), CompileError> {
        while let Some(ch) = self.peek() {
            if ch == b' ' || ch == b'\t' {
                self.bump();
                continue;
            }

            let kind = match ch {
                b'+' => {
                    self.bump();
                    TokenKind::Plus
                }
                b'-' => {
                    self.bump();
                    TokenKind::Minus
                }
                b'*' => {
                    self.bump();
                    TokenKind::Star
                }
                b'/' => {
                    self.bump();
                    TokenKind::Slash
                }
                b'<' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    }
                }
                b'>' => {
                    self.bump();
                    if self.peek() == Some(b'=') {
                        self.bump();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    }
                }
                b'=' => {
                    self.bump();
                    TokenKind::Equal
                }
                b'(' => {
                    self.bump();
                    TokenKind::LParen
                }
                b')' => {
                    self.bump();
                    TokenKind::RParen
                }
                b',' => {
                    self.bump();
                    TokenKind::Comma
                }
                b':' => {
                    self.bump();
                    TokenKind::Colon
                }
                b'0'..=b'9' => self.lex_number()?,
                _ => {
                    if is_ident_start(ch) {
                        self.lex_ident_or_keyword()
                    } else {
                        return Err(CompileError::syntax(
                            self.line,
                            format!("unexpected character '{}'", ch as char),
                        ));
                    }
                }
            };
            tokens.push(Token {
                kind,
                line: self.line,
            });
        }
        Ok(())
    }

    fn lex_number(&mut self) -> Result<TokenKind, CompileError> {
        let start = self.index;
        while let Some(b'0'..=b'9') = self.peek() {
            self.bump();
        }

        // A '.' followed by a digit makes this a float literal; it parses
        // so that assigning it can be rejected as a non-integer constant.
        let mut is_float = false;
        if self.peek() == Some(b'.') {
            if let Some(b'0'..=b'9') = self.peek_next() {
                is_float = true;
                self.bump();
                while let Some(b'0'..=b'9') = self.peek() {
                    self.bump();
                }
            }
        }

        let text = &self.text[start..self.index];
        if is_float {
            let value = text.parse::<f64>().map_err(|_| {
                CompileError::syntax(self.line, format!("invalid float literal '{text}'"))
            })?;
            Ok(TokenKind::Float(value))
        } else {
            let value = text.parse::<i32>().map_err(|_| {
                CompileError::syntax(self.line, format!("integer literal '{text}' out of range"))
            })?;
            Ok(TokenKind::Int(value))
        }
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let start = self.index;
        while let Some(ch) = self.peek() {
            if is_ident_continue(ch) {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.text[start..self.index];
        match text {
            "if" => TokenKind::If,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            _ => TokenKind::Ident(text.to_string()),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }

    fn bump(&mut self) {
        if self.index < self.bytes.len() {
            self.index += 1;
        }
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source)
            .expect("lex should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn lexes_assignment() {
        assert_eq!(
            kinds("a = 15"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Equal,
                TokenKind::Int(15),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strips_comments_and_blank_lines() {
        assert_eq!(
            kinds("a = 15  # set a to 15\n\n"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Equal,
                TokenKind::Int(15),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn emits_indent_and_dedent_tokens() {
        let tokens = kinds("while i < 8:\n    i = i + 1\nv = 2");
        let indents = tokens
            .iter()
            .filter(|kind| matches!(kind, TokenKind::Indent))
            .count();
        let dedents = tokens
            .iter()
            .filter(|kind| matches!(kind, TokenKind::Dedent))
            .count();
        assert_eq!(indents, 1);
        assert_eq!(dedents, 1);
    }

    #[test]
    fn closes_open_blocks_at_end_of_input() {
        let tokens = kinds("if a > 2:\n    if a > 3:\n        a = 1");
        let dedents = tokens
            .iter()
            .filter(|kind| matches!(kind, TokenKind::Dedent))
            .count();
        assert_eq!(dedents, 2);
        assert_eq!(tokens.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn tracks_line_numbers() {
        let tokens = lex("a = 1\n\nb = 2").expect("lex should succeed");
        let b_token = tokens
            .iter()
            .find(|token| token.kind == TokenKind::Ident("b".to_string()))
            .expect("token for b");
        assert_eq!(b_token.line, 3);
    }

    #[test]
    fn lexes_comparison_operators() {
        assert_eq!(
            kinds("a <= b >= c"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Le,
                TokenKind::Ident("b".to_string()),
                TokenKind::Ge,
                TokenKind::Ident("c".to_string()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_float_literal() {
        assert_eq!(
            kinds("x = 1.5"),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::Equal,
                TokenKind::Float(1.5),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn rejects_inconsistent_dedent() {
        let err = lex("if a > 2:\n        a = 1\n    a = 2").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { line: 3, .. }));
    }

    #[test]
    fn rejects_unexpected_character() {
        let err = lex("a = $").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { line: 1, .. }));
    }

    #[test]
    fn rejects_tab_indentation() {
        let err = lex("if a > 2:\n\ta = 1").unwrap_err();
        assert!(matches!(err, CompileError::Syntax { line: 2, .. }));
    }
}
