use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::LlmClient;
use crate::message::{GenerateOptions, Message};
use crate::provider::LlmError;
use crate::tool::call::{parse_tool_calls, ToolCall};
use crate::tool::tool::{tool_system_prompt, ContainsTool, ToolBox};

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const NOT_UNDERSTOOD: &str = "Sorry, I don't understand. Please try again.";
pub const UNKNOWN_TOOL: &str = "Tool does not exist, please try again.";

/// What to do after a tool ran
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// append the message to the conversation and ask the model again
    Continue(Message),
    /// stop, this is the answer
    Final(String),
}

/// Executes the tool calls parsed from a model answer
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, call: &ToolCall) -> Result<Dispatch, LlmError>;
}

#[derive(Debug, Error)]
pub enum ToolLoopError {
    #[error("no final answer after {attempts} attempts")]
    NoFinalAnswer { attempts: usize },
    #[error("model call failed: {0}")]
    Llm(#[source] LlmError),
    #[error("tool {tool} failed: {source}")]
    Tool { tool: String, #[source] source: LlmError },
}

/// Prompt-engineered function calling: the model sees the tool schemas in its system
/// prompt and answers with a JSON array of calls, which are dispatched to a handler
/// until one of them produces the final answer.
pub struct ToolLoop<'a> {
    client: &'a LlmClient,
    tools: ToolBox,
    handler: &'a dyn ToolHandler,
    max_attempts: usize,
    options: GenerateOptions,
}

impl<'a> ToolLoop<'a> {
    pub fn new(client: &'a LlmClient, tools: ToolBox, handler: &'a dyn ToolHandler) -> Self {
        Self {
            client,
            tools,
            handler,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn run(&self, question: &str) -> Result<String, ToolLoopError> {
        let mut history = vec![
            Message::system(tool_system_prompt(&self.tools)),
            Message::human(question),
        ];

        for attempt in 1..=self.max_attempts {
            let completion = self
                .client
                .generate(history.clone(), &self.options)
                .await
                .map_err(ToolLoopError::Llm)?;
            let content = completion.content();
            debug!(target: "genai::tools", attempt, "model answered: {}", content);
            history.push(Message::ai(content.clone()));

            let Some(calls) = parse_tool_calls(&content) else {
                warn!(target: "genai::tools", attempt, "answer is not a tool call, asking again");
                history.push(Message::human(NOT_UNDERSTOOD));
                continue;
            };

            for call in calls {
                if !self.tools.contains_tool(&call.tool) {
                    warn!(target: "genai::tools", attempt, "unknown tool {}, asking again", call.tool);
                    history.push(Message::human(UNKNOWN_TOOL));
                    continue;
                }

                info!(target: "genai::tools", attempt, "calling {} with {:?}", call.tool, call.tool_input);
                let dispatch = self.handler.call(&call).await.map_err(|source| ToolLoopError::Tool {
                    tool: call.tool.clone(),
                    source,
                })?;
                match dispatch {
                    Dispatch::Continue(message) => history.push(message),
                    Dispatch::Final(answer) => return Ok(answer),
                }
            }
        }

        Err(ToolLoopError::NoFinalAnswer { attempts: self.max_attempts })
    }
}
