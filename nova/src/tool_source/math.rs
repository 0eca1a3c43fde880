//! In-process math tools.
//!
//! Same roster and messages as the math tool server exposes over JSON-RPC;
//! embedding them directly is for tests and single-process deployments.

use std::f64::consts::PI;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tool_source::{ToolCallContent, ToolSource, ToolSourceError, ToolSpec};

/// Arithmetic and geometry tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct MathToolSource;

impl MathToolSource {
    /// Tool names served here, used for answer source classification.
    pub const NAMES: &'static [&'static str] = &[
        "add",
        "subtract",
        "multiply",
        "divide",
        "power",
        "modulus",
        "sqrt",
        "calculate_area_circle",
        "calculate_area_rectangle",
        "calculate_area_triangle",
    ];

    pub fn new() -> Self {
        Self
    }
}

fn number_schema(params: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> = params
        .iter()
        .map(|p| (p.to_string(), json!({"type": "number"})))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": params,
    })
}

fn number_arg(arguments: &Value, key: &str) -> Result<f64, ToolSourceError> {
    arguments
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolSourceError::InvalidInput(format!("missing numeric argument '{key}'")))
}

fn result_text(value: f64) -> ToolCallContent {
    ToolCallContent {
        text: format!("{value}"),
    }
}

#[async_trait]
impl ToolSource for MathToolSource {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError> {
        let spec = |name: &str, description: &str, params: &[&str]| ToolSpec {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema: number_schema(params),
        };
        Ok(vec![
            spec("add", "Return the sum of two numbers.", &["a", "b"]),
            spec(
                "subtract",
                "Return the difference of two numbers (a - b).",
                &["a", "b"],
            ),
            spec("multiply", "Return the product of two numbers.", &["a", "b"]),
            spec(
                "divide",
                "Return the division of two numbers (a / b). Raises error on divide-by-zero.",
                &["a", "b"],
            ),
            spec(
                "power",
                "Return base raised to the power of exponent.",
                &["base", "exponent"],
            ),
            spec(
                "modulus",
                "Return the remainder of a divided by b.",
                &["a", "b"],
            ),
            spec(
                "sqrt",
                "Return the square root of a non-negative number.",
                &["n"],
            ),
            spec(
                "calculate_area_circle",
                "Calculate the area of a circle given its radius.",
                &["radius"],
            ),
            spec(
                "calculate_area_rectangle",
                "Calculate the area of a rectangle given its length and width.",
                &["length", "width"],
            ),
            spec(
                "calculate_area_triangle",
                "Calculate the area of a triangle given its base and height.",
                &["base", "height"],
            ),
        ])
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let value = match name {
            "add" => number_arg(&arguments, "a")? + number_arg(&arguments, "b")?,
            "subtract" => number_arg(&arguments, "a")? - number_arg(&arguments, "b")?,
            "multiply" => number_arg(&arguments, "a")? * number_arg(&arguments, "b")?,
            "divide" => {
                let a = number_arg(&arguments, "a")?;
                let b = number_arg(&arguments, "b")?;
                if b == 0.0 {
                    return Err(ToolSourceError::InvalidInput(
                        "Cannot divide by zero".to_string(),
                    ));
                }
                a / b
            }
            "power" => {
                number_arg(&arguments, "base")?.powf(number_arg(&arguments, "exponent")?)
            }
            "modulus" => {
                let a = number_arg(&arguments, "a")?;
                let b = number_arg(&arguments, "b")?;
                if b == 0.0 {
                    return Err(ToolSourceError::InvalidInput(
                        "Cannot perform modulus with zero".to_string(),
                    ));
                }
                a % b
            }
            "sqrt" => {
                let n = number_arg(&arguments, "n")?;
                if n < 0.0 {
                    return Err(ToolSourceError::InvalidInput(
                        "Cannot take square root of a negative number".to_string(),
                    ));
                }
                n.sqrt()
            }
            "calculate_area_circle" => {
                let radius = number_arg(&arguments, "radius")?;
                PI * radius * radius
            }
            "calculate_area_rectangle" => {
                number_arg(&arguments, "length")? * number_arg(&arguments, "width")?
            }
            "calculate_area_triangle" => {
                0.5 * number_arg(&arguments, "base")? * number_arg(&arguments, "height")?
            }
            other => return Err(ToolSourceError::NotFound(other.to_string())),
        };
        Ok(result_text(value))
    }
}
