//! Lexer
//!
//! Character stream -> token stream. Structured the same way as a
//! hand-rolled recursive scanner: a `Vec<char>` with an index, a small
//! `peek` closure for lookahead, and one branch per character class.

use crate::error::TokenError;
use crate::token::{keyword_lookup, Token, TokenKind};

const IDENT_DELIMS: &str = ".,:;()|&[]*/+-<=>!{}#\"'";

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || matches!(c, '?' | '@' | '$' | '_')
}

fn is_ident_continue(c: char) -> bool {
    !c.is_whitespace() && !IDENT_DELIMS.contains(c)
}

/// Tokenize a full Z source text. Always terminates the result with `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenError> {
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line = 0usize;
    let mut col = 0usize;

    let peek = |pos: usize| -> Option<char> { chars.get(pos).copied() };

    while pos < len {
        let c = chars[pos];
        let (start_line, start_col) = (line, col);

        // Whitespace
        if c == '\n' {
            pos += 1;
            line += 1;
            col = 0;
            continue;
        }
        if c.is_whitespace() {
            pos += 1;
            col += 1;
            continue;
        }

        // Line comments
        if c == '/' && peek(pos + 1) == Some('/') {
            while pos < len && chars[pos] != '\n' {
                pos += 1;
                col += 1;
            }
            continue;
        }

        // Strings
        if c == '"' {
            let mut body = String::new();
            pos += 1;
            col += 1;
            loop {
                if pos >= len {
                    break;
                }
                let cur = chars[pos];
                if cur == '\\' {
                    // A backslash only inhibits treating the following
                    // quote as the terminator; no further escapes are
                    // interpreted (strings are raw).
                    body.push(cur);
                    pos += 1;
                    col += 1;
                    if pos < len {
                        body.push(chars[pos]);
                        pos += 1;
                        col += 1;
                    }
                    continue;
                }
                if cur == '"' {
                    pos += 1;
                    col += 1;
                    break;
                }
                if cur == '\n' {
                    line += 1;
                    col = 0;
                } else {
                    col += 1;
                }
                body.push(cur);
                pos += 1;
            }
            tokens.push(Token::new(TokenKind::Str(body), start_line, start_col));
            continue;
        }

        // Numbers
        if c.is_ascii_digit() {
            let mut digits = String::new();
            while pos < len && chars[pos].is_ascii_digit() {
                digits.push(chars[pos]);
                pos += 1;
                col += 1;
            }
            if pos < len && chars[pos] == '.' && peek(pos + 1).is_some_and(|c| c.is_ascii_digit()) {
                let mut frac = String::from(".");
                pos += 1;
                col += 1;
                while pos < len && chars[pos].is_ascii_digit() {
                    frac.push(chars[pos]);
                    pos += 1;
                    col += 1;
                }
                let text = format!("{}{}", digits, frac);
                let value: f64 = text.parse().map_err(|_| {
                    TokenError::new(format!("invalid float literal '{}'", text), start_line, start_col, source)
                })?;
                tokens.push(Token::new(TokenKind::Float(value), start_line, start_col));
                continue;
            }
            if pos < len && is_ident_continue(chars[pos]) {
                return Err(TokenError::new(
                    "identifiers cannot start with integers",
                    start_line,
                    start_col,
                    source,
                ));
            }
            let value: i64 = digits.parse().map_err(|_| {
                TokenError::new(format!("invalid integer literal '{}'", digits), start_line, start_col, source)
            })?;
            tokens.push(Token::new(TokenKind::Int(value), start_line, start_col));
            continue;
        }

        // Identifiers / keywords
        if is_ident_start(c) {
            let mut ident = String::new();
            while pos < len && is_ident_continue(chars[pos]) {
                ident.push(chars[pos]);
                pos += 1;
                col += 1;
            }
            let kind = keyword_lookup(&ident).unwrap_or(TokenKind::Id(ident));
            tokens.push(Token::new(kind, start_line, start_col));
            continue;
        }

        // Two-character operators
        macro_rules! two_char {
            ($second:expr, $kind:expr) => {
                if peek(pos + 1) == Some($second) {
                    pos += 2;
                    col += 2;
                    tokens.push(Token::new($kind, start_line, start_col));
                    continue;
                }
            };
        }
        match c {
            '=' => two_char!('=', TokenKind::Eq),
            '!' => two_char!('=', TokenKind::Neq),
            '<' => two_char!('=', TokenKind::Lte),
            '>' => two_char!('=', TokenKind::Gte),
            '+' => {
                two_char!('+', TokenKind::Incr);
                two_char!('=', TokenKind::Addassign);
            }
            '-' => {
                two_char!('-', TokenKind::Decr);
                two_char!('=', TokenKind::Subassign);
            }
            '&' => two_char!('&', TokenKind::And),
            '|' => two_char!('|', TokenKind::Or),
            _ => {}
        }
        if matches!(c, '&' | '|') {
            return Err(TokenError::new(
                format!("unexpected single '{}'", c),
                start_line,
                start_col,
                source,
            ));
        }

        // Single-character tokens
        let kind = match c {
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semic,
            ':' => TokenKind::Colon,
            '\'' => TokenKind::Quote,
            '"' => TokenKind::Dquote,
            '(' => TokenKind::Lround,
            ')' => TokenKind::Rround,
            '[' => TokenKind::Lsquare,
            ']' => TokenKind::Rsquare,
            '{' => TokenKind::Lcurly,
            '}' => TokenKind::Rcurly,
            '.' => TokenKind::Dot,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '/' => TokenKind::Div,
            '*' => TokenKind::Mul,
            '!' => TokenKind::Bang,
            '=' => TokenKind::Assign,
            other => {
                return Err(TokenError::new(
                    format!("unexpected character '{}'", other),
                    start_line,
                    start_col,
                    source,
                ))
            }
        };
        pos += 1;
        col += 1;
        tokens.push(Token::new(kind, start_line, start_col));
    }

    tokens.push(Token::new(TokenKind::Eof, line, col));
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn whitespace_and_comments_yield_only_eof() {
        assert_eq!(kinds("   \t\n  "), vec![TokenKind::Eof]);
        assert_eq!(kinds("// a comment\n// another"), vec![TokenKind::Eof]);
    }

    #[test]
    fn integers_and_floats() {
        assert_eq!(kinds("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
        assert_eq!(kinds("3.14"), vec![TokenKind::Float(3.14), TokenKind::Eof]);
    }

    #[test]
    fn digit_led_identifier_is_an_error() {
        assert!(tokenize("42abc").is_err());
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            kinds("let x = foo;"),
            vec![
                TokenKind::Let,
                TokenKind::Id("x".into()),
                TokenKind::Assign,
                TokenKind::Id("foo".into()),
                TokenKind::Semic,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn special_leading_characters() {
        assert_eq!(kinds("$self"), vec![TokenKind::Id("$self".into()), TokenKind::Eof]);
        assert_eq!(kinds("@tag"), vec![TokenKind::Id("@tag".into()), TokenKind::Eof]);
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            kinds("== != <= >= && || ++ -- += -="),
            vec![
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Lte,
                TokenKind::Gte,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Incr,
                TokenKind::Decr,
                TokenKind::Addassign,
                TokenKind::Subassign,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lone_ampersand_or_pipe_is_an_error() {
        assert!(tokenize("&").is_err());
        assert!(tokenize("|").is_err());
    }

    #[test]
    fn strings_allow_escaped_quote_inside() {
        assert_eq!(
            kinds(r#""a\"b""#),
            vec![TokenKind::Str("a\\\"b".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_ends_at_eof() {
        assert_eq!(kinds("\"abc"), vec![TokenKind::Str("abc".into()), TokenKind::Eof]);
    }

    #[test]
    fn terminator_invariant_always_holds() {
        for src in ["", "   ", "1 + 2;", "// just a comment"] {
            let toks = tokenize(src).unwrap();
            assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
        }
    }

    #[test]
    fn line_and_column_tracking() {
        let toks = tokenize("let a\n= 1;").unwrap();
        let assign = toks.iter().find(|t| t.kind == TokenKind::Assign).unwrap();
        assert_eq!(assign.line, 1);
        assert_eq!(assign.column, 0);
    }
}
