//! Error Taxonomy
//!
//! Four error kinds, all carrying enough location information for
//! diagnostics, unified behind a single `ZaiError` so callers (the file
//! runner, `-e` eval, and the REPL) have one type to match on.

use std::fmt;

use crate::token::{Token, TokenKind};

/// Raised by the lexer on malformed source text.
#[derive(Debug, Clone)]
pub struct TokenError {
    pub line: usize,
    pub column: usize,
    pub source_lines: Vec<String>,
    pub message: String,
}

impl TokenError {
    pub fn new(message: impl Into<String>, line: usize, column: usize, source: &str) -> Self {
        TokenError {
            line,
            column,
            source_lines: source.lines().map(|l| l.to_string()).collect(),
            message: message.into(),
        }
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token error at {}:{}: {}", self.line, self.column, self.message)?;
        if let Some(line_text) = self.source_lines.get(self.line) {
            write!(f, "\n  {}\n  {}^", line_text, " ".repeat(self.column))?;
        }
        Ok(())
    }
}

impl std::error::Error for TokenError {}

/// Raised by the parser when the token stream does not match the grammar.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub expected: Vec<String>,
    pub got: TokenKind,
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, expected: Vec<String>, got: &Token) -> Self {
        ParseError {
            line: got.line,
            column: got.column,
            expected,
            got: got.kind.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at {}:{}: {} (expected one of {:?}, got {:?})",
            self.line, self.column, self.message, self.expected, self.got
        )
    }
}

impl std::error::Error for ParseError {}

/// The unified error type threaded through lexing, parsing, and evaluation.
#[derive(Debug, Clone)]
pub enum ZaiError {
    Token(TokenError),
    Parse(ParseError),
    Type {
        op: String,
        left: &'static str,
        right: Option<&'static str>,
    },
    Runtime(String),
}

impl From<TokenError> for ZaiError {
    fn from(e: TokenError) -> Self {
        ZaiError::Token(e)
    }
}

impl From<ParseError> for ZaiError {
    fn from(e: ParseError) -> Self {
        ZaiError::Parse(e)
    }
}

impl std::error::Error for ZaiError {}

impl ZaiError {
    pub fn runtime(message: impl Into<String>) -> Self {
        ZaiError::Runtime(message.into())
    }

    pub fn type_error(op: impl Into<String>, left: &'static str, right: Option<&'static str>) -> Self {
        ZaiError::Type { op: op.into(), left, right }
    }
}

impl fmt::Display for ZaiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZaiError::Token(e) => write!(f, "{}", e),
            ZaiError::Parse(e) => write!(f, "{}", e),
            ZaiError::Type { op, left, right } => match right {
                Some(right) => write!(f, "Type error: cannot apply '{}' to {} and {}", op, left, right),
                None => write!(f, "Type error: cannot apply '{}' to {}", op, left),
            },
            ZaiError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

pub type ZaiResult<T> = Result<T, ZaiError>;
