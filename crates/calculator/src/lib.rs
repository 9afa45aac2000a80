//! Restricted arithmetic evaluation.
//!
//! Only numeric literals, a fixed operator set, a handful of named constants and
//! single-argument math functions are accepted. Anything else is a parse error;
//! there is no way to reach host code from an expression.

mod error;
mod eval;
mod lexer;
mod tool;

pub use error::EvalError;
pub use eval::{evaluate, format_number, MAX_NESTING_DEPTH};
pub use tool::{CalculatorTool, CALCULATOR_TOOL_NAME};

/// Evaluates `expression` and renders the result the way the tool reports it.
pub fn evaluate_to_string(expression: &str) -> Result<String, EvalError> {
    evaluate(expression).map(format_number)
}
