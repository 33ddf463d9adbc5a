use std::fmt::Debug;
use async_trait::async_trait;
use futures::Stream;
use std::error::Error;
use std::sync::Arc;

use crate::chat::JsonHooks;
use crate::completion::{ChatChunk, Completion};
use crate::message::ChatRequest;

pub type LlmError = Box<dyn Error + Send + Sync>;
pub type LlmStream = Box<dyn Stream<Item = Result<ChatChunk, LlmError>> + Send + Unpin>;

#[derive(Debug, Clone)]
pub struct EnvVar {
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub env_vars: Vec<EnvVar>,
}

impl EnvVar {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
        }
    }
}

/// A model-serving backend: chat, streaming chat and embeddings.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn models(&self) -> Result<Vec<String>, LlmError>;

    async fn default_model(&self) -> Result<String, LlmError> {
        let models = self.models().await?;
        models
            .first()
            .cloned()
            .ok_or_else(|| "no model available".into())
    }

    async fn chat(&self, request: ChatRequest) -> Result<Completion, LlmError>;

    async fn chat_stream(&self, request: ChatRequest) -> Result<LlmStream, LlmError>;

    async fn embed(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    /// Install request/response hooks, e.g. the request logger
    fn set_hooks(&mut self, hooks: Arc<dyn JsonHooks>);

    fn name(&self) -> &'static str;

    /// Returns provider information including environment variables
    fn info() -> ProviderInfo where Self: Sized;
}

impl Debug for dyn LlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LlmProvider({})", self.name())
    }
}
