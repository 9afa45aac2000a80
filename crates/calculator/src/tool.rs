use agent_gateway::{Tool, ToolDefinition};
use serde_json::{json, Value};

use crate::evaluate_to_string;

/// Name the tool is registered and declared under.
pub const CALCULATOR_TOOL_NAME: &str = "calculator";

/// `calculator(expression)` tool backed by the restricted evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculatorTool;

impl Tool for CalculatorTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: CALCULATOR_TOOL_NAME.to_string(),
            description: "Evaluate a math expression and return the result. Supports + - * / % ^, \
                          parentheses, pi, e and sqrt/abs/ln/log/sin/cos/tan/floor/ceil/round."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "Arithmetic expression, for example \"(2 + 3) * 4\""
                    }
                },
                "required": ["expression"]
            }),
        }
    }

    fn call(&self, arguments: &Value) -> Result<String, String> {
        let expression = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| "Error: missing string argument 'expression'".to_string())?;

        evaluate_to_string(expression).map_err(|error| format!("Error: {error}"))
    }
}
