use std::f64::consts;

use crate::error::EvalError;
use crate::lexer::{tokenize, Token, TokenKind};

/// Largest magnitude printed as an integer; beyond this `f64` loses unit precision.
const MAX_INTEGRAL_DISPLAY: f64 = 1e15;
/// Deepest nesting of parentheses, calls and signs the parser accepts.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parses and evaluates an arithmetic expression.
///
/// Precedence, loosest first: `+ -`, `* / %`, unary sign, `^` (right
/// associative). `-2^2` is therefore `-4`.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let value = parser.expression()?;

    if let Some(token) = parser.peek() {
        return Err(EvalError::UnexpectedToken {
            found: token.kind.to_string(),
            position: token.position,
        });
    }

    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NonFinite)
    }
}

/// Renders a result, dropping the fractional part of integral values.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    if value.fract() == 0.0 && value.abs() < MAX_INTEGRAL_DISPLAY {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<(), EvalError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => Ok(()),
            Some(token) => Err(EvalError::UnexpectedToken {
                found: token.kind.to_string(),
                position: token.position,
            }),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn expression(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;

        loop {
            match self.peek_kind() {
                Some(TokenKind::Plus) => {
                    self.advance();
                    value += self.term()?;
                }
                Some(TokenKind::Minus) => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.unary()?;

        loop {
            match self.peek_kind() {
                Some(TokenKind::Star) => {
                    self.advance();
                    value *= self.unary()?;
                }
                Some(TokenKind::Slash) => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value /= divisor;
                }
                Some(TokenKind::Percent) => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    value %= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    /// Every nested operand passes through here, so this bounds recursion.
    fn unary(&mut self) -> Result<f64, EvalError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(EvalError::TooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }

        self.depth += 1;
        let value = self.signed_operand();
        self.depth -= 1;
        value
    }

    fn signed_operand(&mut self) -> Result<f64, EvalError> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.advance();
                Ok(-self.unary()?)
            }
            Some(TokenKind::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.primary()?;

        if matches!(self.peek_kind(), Some(TokenKind::Caret)) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }

        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        let Some(token) = self.advance() else {
            return Err(EvalError::UnexpectedEnd);
        };

        match token.kind {
            TokenKind::Number(value) => Ok(value),
            TokenKind::LParen => {
                let value = self.expression()?;
                self.expect_rparen()?;
                Ok(value)
            }
            TokenKind::Ident(name) => {
                if matches!(self.peek_kind(), Some(TokenKind::LParen)) {
                    self.advance();
                    let argument = self.expression()?;
                    self.expect_rparen()?;
                    apply_function(&name, argument)
                } else {
                    constant(&name)
                }
            }
            other => Err(EvalError::UnexpectedToken {
                found: other.to_string(),
                position: token.position,
            }),
        }
    }
}

fn constant(name: &str) -> Result<f64, EvalError> {
    match name {
        "pi" => Ok(consts::PI),
        "e" => Ok(consts::E),
        "tau" => Ok(consts::TAU),
        _ => Err(EvalError::UnknownIdentifier(name.to_string())),
    }
}

fn apply_function(name: &str, argument: f64) -> Result<f64, EvalError> {
    let value = match name {
        "sqrt" => argument.sqrt(),
        "abs" => argument.abs(),
        "ln" => argument.ln(),
        "log" => argument.log10(),
        "sin" => argument.sin(),
        "cos" => argument.cos(),
        "tan" => argument.tan(),
        "floor" => argument.floor(),
        "ceil" => argument.ceil(),
        "round" => argument.round(),
        _ => return Err(EvalError::UnknownFunction(name.to_string())),
    };

    Ok(value)
}
