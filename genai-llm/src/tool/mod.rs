pub mod tool;
pub mod call;
pub mod dispatch;

#[cfg(test)]
mod tests;

pub use tool::{ToolDescription, ToolBox, ContainsTool, tool_system_prompt};
pub use call::{ToolCall, parse_tool_calls};
pub use dispatch::{Dispatch, ToolHandler, ToolLoop, ToolLoopError, DEFAULT_MAX_ATTEMPTS, NOT_UNDERSTOOD, UNKNOWN_TOOL};
