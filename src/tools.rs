//! Tools registered with every gateway.

use agent_gateway::{Tool, ToolDefinition, ToolRegistry};
use calculator::CalculatorTool;
use serde_json::{json, Value};

pub const SAY_HELLO_TOOL_NAME: &str = "say_hello";

/// Registry with the calculator and greeting tools.
pub fn default_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(CalculatorTool)
        .with_tool(SayHelloTool)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SayHelloTool;

impl Tool for SayHelloTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: SAY_HELLO_TOOL_NAME.to_string(),
            description: "Useful for greeting a user by name.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Name of the person to greet" }
                },
                "required": ["name"]
            }),
        }
    }

    fn call(&self, arguments: &Value) -> Result<String, String> {
        let name = arguments
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| "Error: missing string argument 'name'".to_string())?;

        Ok(format!("Hello {name}, I hope you are well today"))
    }
}
