use std::fmt;

use crate::error::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "number {value}"),
            Self::Ident(name) => write!(f, "identifier '{name}'"),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Star => f.write_str("'*'"),
            Self::Slash => f.write_str("'/'"),
            Self::Percent => f.write_str("'%'"),
            Self::Caret => f.write_str("'^'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0usize;

    while index < chars.len() {
        let ch = chars[index];
        let position = index;

        if ch.is_whitespace() {
            index += 1;
            continue;
        }

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' if chars.get(index + 1) == Some(&'*') => {
                index += 1;
                TokenKind::Caret
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            _ if ch.is_ascii_digit() || ch == '.' => {
                let (value, consumed) = read_number(&chars[index..], position)?;
                index += consumed;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    position,
                });
                continue;
            }
            _ if ch.is_ascii_alphabetic() || ch == '_' => {
                let mut end = index;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                let name: String = chars[index..end].iter().collect();
                index = end;
                tokens.push(Token {
                    kind: TokenKind::Ident(name.to_ascii_lowercase()),
                    position,
                });
                continue;
            }
            _ => return Err(EvalError::UnexpectedChar { ch, position }),
        };

        tokens.push(Token { kind, position });
        index += 1;
    }

    Ok(tokens)
}

fn read_number(chars: &[char], position: usize) -> Result<(f64, usize), EvalError> {
    let mut end = 0usize;
    while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == '.') {
        end += 1;
    }

    // Exponent only counts when digits follow, so `2e` stays "2 * e" territory.
    if end < chars.len() && matches!(chars[end], 'e' | 'E') {
        let mut exponent_end = end + 1;
        if exponent_end < chars.len() && matches!(chars[exponent_end], '+' | '-') {
            exponent_end += 1;
        }
        let digits_start = exponent_end;
        while exponent_end < chars.len() && chars[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > digits_start {
            end = exponent_end;
        }
    }

    let text: String = chars[..end].iter().collect();
    text.parse::<f64>()
        .map(|value| (value, end))
        .map_err(|_| EvalError::InvalidNumber { text, position })
}
