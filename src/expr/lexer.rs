//! Tokenizer for condition expressions.

use crate::expr::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Undefined,
    OrOr,
    AndAnd,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,
    Bang,
    Minus,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Eof,
}

impl TokenKind {
    /// Short human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::Str(s) => format!("string '{}'", s),
            TokenKind::Ident(name) => format!("identifier '{}'", name),
            TokenKind::True => "'true'".into(),
            TokenKind::False => "'false'".into(),
            TokenKind::Null => "'null'".into(),
            TokenKind::Undefined => "'undefined'".into(),
            TokenKind::OrOr => "'||'".into(),
            TokenKind::AndAnd => "'&&'".into(),
            TokenKind::EqEq => "'=='".into(),
            TokenKind::EqEqEq => "'==='".into(),
            TokenKind::NotEq => "'!='".into(),
            TokenKind::NotEqEq => "'!=='".into(),
            TokenKind::Lt => "'<'".into(),
            TokenKind::Le => "'<='".into(),
            TokenKind::Gt => "'>'".into(),
            TokenKind::Ge => "'>='".into(),
            TokenKind::Bang => "'!'".into(),
            TokenKind::Minus => "'-'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::LBracket => "'['".into(),
            TokenKind::RBracket => "']'".into(),
            TokenKind::Dot => "'.'".into(),
            TokenKind::Eof => "end of input".into(),
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

/// Split `source` into tokens, always ending with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let kind = match c {
            b'(' => {
                pos += 1;
                TokenKind::LParen
            }
            b')' => {
                pos += 1;
                TokenKind::RParen
            }
            b'[' => {
                pos += 1;
                TokenKind::LBracket
            }
            b']' => {
                pos += 1;
                TokenKind::RBracket
            }
            b'.' => {
                pos += 1;
                TokenKind::Dot
            }
            b'-' => {
                pos += 1;
                TokenKind::Minus
            }
            b'|' | b'&' => {
                if bytes.get(pos + 1) != Some(&c) {
                    return Err(ExprError::parse(
                        start,
                        format!("expected '{0}{0}'", c as char),
                    ));
                }
                pos += 2;
                if c == b'|' {
                    TokenKind::OrOr
                } else {
                    TokenKind::AndAnd
                }
            }
            b'=' => {
                if bytes.get(pos + 1) != Some(&b'=') {
                    return Err(ExprError::parse(start, "assignment is not supported, use '=='"));
                }
                if bytes.get(pos + 2) == Some(&b'=') {
                    pos += 3;
                    TokenKind::EqEqEq
                } else {
                    pos += 2;
                    TokenKind::EqEq
                }
            }
            b'!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    if bytes.get(pos + 2) == Some(&b'=') {
                        pos += 3;
                        TokenKind::NotEqEq
                    } else {
                        pos += 2;
                        TokenKind::NotEq
                    }
                } else {
                    pos += 1;
                    TokenKind::Bang
                }
            }
            b'<' | b'>' => {
                let or_equal = bytes.get(pos + 1) == Some(&b'=');
                pos += if or_equal { 2 } else { 1 };
                match (c, or_equal) {
                    (b'<', false) => TokenKind::Lt,
                    (b'<', true) => TokenKind::Le,
                    (_, false) => TokenKind::Gt,
                    (_, true) => TokenKind::Ge,
                }
            }
            b'\'' | b'"' => {
                let (text, end) = lex_string(source, pos)?;
                pos = end;
                TokenKind::Str(text)
            }
            b'0'..=b'9' => {
                let end = scan_number(bytes, pos);
                let text = &source[pos..end];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::parse(start, format!("invalid number '{}'", text)))?;
                pos = end;
                TokenKind::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == b'_' || c == b'$' => {
                let mut end = pos + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b'$')
                {
                    end += 1;
                }
                let word = &source[pos..end];
                pos = end;
                match word {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    "undefined" => TokenKind::Undefined,
                    _ => TokenKind::Ident(word.to_string()),
                }
            }
            _ => {
                let ch = source[pos..].chars().next().unwrap_or('?');
                return Err(ExprError::parse(start, format!("unexpected character '{}'", ch)));
            }
        };

        tokens.push(Token { kind, offset: start });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        offset: source.len(),
    });
    Ok(tokens)
}

fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            end = exp;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
        }
    }
    end
}

/// Lex a quoted string starting at `start`. Returns the text and the byte
/// offset just past the closing quote.
fn lex_string(source: &str, start: usize) -> Result<(String, usize), ExprError> {
    let mut chars = source[start..].char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err(ExprError::parse(start, "unterminated string")),
    };
    let mut text = String::new();

    while let Some((i, ch)) = chars.next() {
        match ch {
            c if c == quote => return Ok((text, start + i + c.len_utf8())),
            '\\' => {
                let Some((j, escaped)) = chars.next() else {
                    break;
                };
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    '\\' | '\'' | '"' => escaped,
                    other => {
                        return Err(ExprError::parse(
                            start + j,
                            format!("unknown escape '\\{}'", other),
                        ))
                    }
                });
            }
            c => text.push(c),
        }
    }
    Err(ExprError::parse(start, "unterminated string"))
}
