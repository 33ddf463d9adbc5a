use std::sync::Arc;
use serde_json::json;

/// A tool must be able to describe its parameter as a json schema
pub trait ToolDescription: Send + Sync {

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn parameters_schema(&self) -> serde_json::Value;

    /// One line telling the model what `tool_input` should look like
    fn input_hint(&self) -> Option<&'static str> {
        None
    }
}

/// A toolbox is a set of tool
pub type ToolBox = Vec<Arc<dyn ToolDescription>>;

pub trait ContainsTool {
    fn contains_tool(&self, name: &str) -> bool;
}

impl ContainsTool for ToolBox {
    fn contains_tool(&self, name: &str) -> bool {
        self.iter().any(|tool| tool.name() == name)
    }
}

/// System prompt teaching a model without native function calling how to call tools:
/// the tool schemas followed by the JSON array format expected in its answer.
pub fn tool_system_prompt(tools: &ToolBox) -> String {
    let definitions: Vec<_> = tools
        .iter()
        .map(|tool| json!({
            "name": tool.name(),
            "description": tool.description(),
            "parameters": tool.parameters_schema(),
        }))
        .collect();
    let definitions = serde_json::Value::Array(definitions).to_string();

    let mut prompt = format!(
        r#"You have access to the following tools:

{definitions}

To use a tool, respond with a JSON object with the following structure:
[
	{{
		"tool": <name of the called tool>,
		"tool_input": <parameters for the tool matching the above JSON schema>
	}}
]

If you need to call multiple tools, append more tool objects to the array.
"#
    );

    let hints: Vec<_> = tools
        .iter()
        .filter_map(|tool| tool.input_hint().map(|hint| format!("- when calling {}: {}", tool.name(), hint)))
        .collect();
    if !hints.is_empty() {
        prompt.push_str("The tool input should be a JSON object with the following structure:\n");
        for hint in hints {
            prompt.push_str(&hint);
            prompt.push('\n');
        }
    }

    prompt
}
