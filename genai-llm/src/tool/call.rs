use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One tool invocation as written by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub tool_input: Map<String, Value>,
}

impl ToolCall {
    pub fn new<S: Into<String>>(tool: S, tool_input: Value) -> Self {
        let tool_input = match tool_input {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { tool: tool.into(), tool_input }
    }

    /// String argument of the call, if present
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.tool_input.get(key).and_then(Value::as_str)
    }
}

/// Parse a model answer as a JSON array of tool calls.
///
/// Returns None when the answer is anything else. A single object is not accepted,
/// the prompt asks for an array, and neither is an empty array.
/// Markdown code fences around the JSON are ignored.
pub fn parse_tool_calls(content: &str) -> Option<Vec<ToolCall>> {
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        text = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    serde_json::from_str::<Vec<ToolCall>>(text)
        .ok()
        .filter(|calls| !calls.is_empty())
}
