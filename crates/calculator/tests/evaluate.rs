use agent_gateway::{Tool, ToolRegistry};
use assert_matches::assert_matches;
use std::thread;

use calculator::{
    evaluate, evaluate_to_string, CalculatorTool, EvalError, CALCULATOR_TOOL_NAME,
    MAX_NESTING_DEPTH,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn evaluates_operator_precedence() {
    assert_eq!(evaluate("1 + 2 * 3"), Ok(7.0));
    assert_eq!(evaluate("(1 + 2) * 3"), Ok(9.0));
    assert_eq!(evaluate("10 - 4 - 3"), Ok(3.0));
    assert_eq!(evaluate("7 % 4"), Ok(3.0));
    assert_eq!(evaluate("2 ** 10"), Ok(1024.0));
}

#[test]
fn evaluates_constants_and_functions() {
    assert_eq!(evaluate_to_string("sqrt(16) + abs(-2)"), Ok("6".to_string()));
    assert_eq!(evaluate_to_string("floor(2.7) * ceil(1.2)"), Ok("4".to_string()));
    assert_eq!(evaluate_to_string("round(pi * 100) / 100"), Ok("3.14".to_string()));
    assert_eq!(evaluate_to_string("2.5 * 2"), Ok("5".to_string()));
}

#[test]
fn rejects_code_like_input() {
    assert_matches!(
        evaluate("__import__('os').system('ls')"),
        Err(EvalError::UnexpectedChar { ch: '\'', .. })
    );
    assert_eq!(
        evaluate("exec(1)"),
        Err(EvalError::UnknownFunction("exec".to_string()))
    );
    assert_eq!(
        evaluate("x + 1"),
        Err(EvalError::UnknownIdentifier("x".to_string()))
    );
}

#[test]
fn reports_structural_errors() {
    assert_eq!(evaluate("   "), Err(EvalError::Empty));
    assert_eq!(evaluate("1 +"), Err(EvalError::UnexpectedEnd));
    assert_eq!(evaluate("(1 + 2"), Err(EvalError::UnexpectedEnd));
    assert_matches!(evaluate("1 2"), Err(EvalError::UnexpectedToken { position: 2, .. }));
    assert_matches!(evaluate(")"), Err(EvalError::UnexpectedToken { position: 0, .. }));
}

#[test]
fn reports_arithmetic_errors() {
    assert_eq!(evaluate("5 / (2 - 2)"), Err(EvalError::DivisionByZero));
    assert_eq!(evaluate("5 % 0"), Err(EvalError::DivisionByZero));
    assert_eq!(evaluate("sqrt(-1)"), Err(EvalError::NonFinite));
    assert_eq!(evaluate("10 ^ 400"), Err(EvalError::NonFinite));
}

#[test]
fn deeply_nested_input_is_an_error_not_a_crash() {
    let too_deep = Err(EvalError::TooDeep {
        limit: MAX_NESTING_DEPTH,
    });

    // Run on a default-sized worker stack, like a turn thread.
    let results = thread::spawn(|| {
        [
            evaluate(&format!("{}1", "(".repeat(100_000))),
            evaluate(&format!("{}1", "-".repeat(100_000))),
            evaluate(&format!("{}1", "sqrt(".repeat(10_000))),
            evaluate(&["2"; 10_000].join("^")),
        ]
    })
    .join()
    .expect("evaluator thread");

    for result in results {
        assert_eq!(result, too_deep);
    }

    assert_eq!(
        CalculatorTool.call(&json!({"expression": "(".repeat(3_000) + "1"})),
        Err(format!("Error: expression is nested deeper than {MAX_NESTING_DEPTH} levels"))
    );
}

#[test]
fn tool_round_trips_through_registry() {
    let registry = ToolRegistry::new().with_tool(CalculatorTool);

    assert_eq!(
        registry.call(CALCULATOR_TOOL_NAME, &json!({"expression": "12 * 12"})),
        Ok("144".to_string())
    );
    assert_eq!(
        registry.call(CALCULATOR_TOOL_NAME, &json!({"expression": "1 +"})),
        Err("Error: unexpected end of expression".to_string())
    );
    assert_eq!(CalculatorTool.definition().input_schema["required"], json!(["expression"]));
}
