// llm/providers/openai/openai.rs
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;

use super::api::*;
use crate::chat::{JsonClient, JsonHooks};
use crate::completion::{ChatChunk, Choice, Completion, ExtractThinkContent, GenerationInfo};
use crate::message::{ChatRequest, ContentPart, Message, Role};
use crate::provider::{EnvVar, LlmError, LlmProvider, LlmStream, ProviderInfo};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI and any server exposing the same `/chat/completions` api
pub struct OpenAiProvider {
    client: JsonClient,
    name: &'static str,
    /// openai itself rejects unknown sampling arguments such as top_k
    sends_top_k: bool,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENAI_BASE_URL.to_string())
    }

    /// The openai api behind another address (proxy, gateway)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: JsonClient::new(base_url).with_api_key(api_key),
            name: "openai",
            sends_top_k: false,
        }
    }

    pub fn compatible(api_key: String, base_url: String) -> Self {
        Self {
            client: JsonClient::new(base_url).with_api_key(api_key),
            name: "openai_compatible",
            sends_top_k: true,
        }
    }

    /// Create OpenAI provider from environment variables
    /// Returns None if OPENAI_API_KEY is not set
    pub fn from_env() -> Option<Self> {
        std::env::var("OPENAI_API_KEY").ok().map(Self::new)
    }

    /// Create OpenAI Compatible provider from environment variables
    /// Returns None if required environment variables are not set
    pub fn from_env_compatible() -> Option<Self> {
        match (std::env::var("OPENAI_COMPATIBLE_API_KEY"), std::env::var("OPENAI_COMPATIBLE_BASE_URL")) {
            (Ok(api_key), Ok(base_url)) => Some(Self::compatible(api_key, base_url)),
            _ => None,
        }
    }

    pub fn compatible_info() -> ProviderInfo {
        ProviderInfo {
            name: "openai_compatible",
            display_name: "OpenAI Compatible API",
            env_vars: vec![
                EnvVar::required("OPENAI_COMPATIBLE_API_KEY", "API key for OpenAI-compatible service"),
                EnvVar::required("OPENAI_COMPATIBLE_BASE_URL", "Base URL for OpenAI-compatible service"),
            ],
        }
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> OpenAiChatRequest {
        OpenAiChatRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(to_openai_message).collect(),
            stream,
            temperature: request.options.temperature,
            top_k: request.options.top_k.filter(|_| self.sends_top_k),
            seed: request.options.seed,
            max_tokens: request.options.max_tokens,
        }
    }
}

fn to_openai_message(message: &Message) -> OpenAiMessage {
    // tool results produced by prompt-based dispatch carry no tool_call_id,
    // which the openai api requires for the "tool" role
    let role = match message.role {
        Role::Tool => "user",
        other => other.wire_name(),
    };

    let content = match message.parts.as_slice() {
        [ContentPart::Text(text)] => OpenAiContent::Text(text.clone()),
        parts => OpenAiContent::Parts(
            parts
                .iter()
                .map(|part| match part {
                    ContentPart::Text(text) => OpenAiContentPart::Text { text: text.clone() },
                    ContentPart::Binary { mime_type, data } => OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl {
                            url: format!("data:{};base64,{}", mime_type, STANDARD.encode(data)),
                        },
                    },
                    ContentPart::ImageUrl(url) => OpenAiContentPart::ImageUrl {
                        image_url: OpenAiImageUrl { url: url.clone() },
                    },
                })
                .collect(),
        ),
    };

    OpenAiMessage { role: role.to_string(), content }
}

fn to_generation_info(usage: &OpenAiUsage) -> GenerationInfo {
    let mut info = GenerationInfo::new(usage.prompt_tokens, usage.completion_tokens);
    if usage.total_tokens.is_some() {
        info.total_tokens = usage.total_tokens;
    }
    info
}

fn to_chunk(response: OpenAiChunkResponse) -> ChatChunk {
    let generation_info = response.usage.as_ref().map(to_generation_info);
    match response.choices.into_iter().next() {
        Some(choice) => ChatChunk {
            content: choice.delta.content.unwrap_or_default(),
            stop_reason: choice.finish_reason,
            generation_info,
        },
        None => ChatChunk { generation_info, ..Default::default() },
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn models(&self) -> Result<Vec<String>, LlmError> {
        let response: OpenAiModelsResponse = self.client.get_json("/models").await?;
        Ok(response.data.into_iter().map(|m| m.id).collect())
    }

    async fn default_model(&self) -> Result<String, LlmError> {
        let models = self.models().await?;

        models
            .iter()
            .find(|m| m.to_lowercase().contains("gpt-4"))
            .or_else(|| models.first())
            .cloned()
            .ok_or_else(|| "no model available".into())
    }

    async fn chat(&self, request: ChatRequest) -> Result<Completion, LlmError> {
        let body = self.build_request(&request, false);
        let response: OpenAiChatResponse = self.client.post_json("/chat/completions", &body).await?;

        // usage is reported per response, keep it on the first choice only
        let mut usage = response.usage.as_ref().map(to_generation_info);
        let choices = response
            .choices
            .into_iter()
            .map(|choice| Choice {
                content: choice.message.content.unwrap_or_default(),
                stop_reason: choice.finish_reason,
                reasoning: None,
                generation_info: usage.take(),
            })
            .collect();

        let model = if response.model.is_empty() { request.model } else { response.model };
        Ok(Completion { model, choices }.extract_think_content())
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<LlmStream, LlmError> {
        let body = self.build_request(&request, true);
        let stream = self.client.post_sse_stream("/chat/completions", &body).await?;

        let converted_stream = stream.map(|result| {
            result.and_then(|json| {
                let response: OpenAiChunkResponse = serde_json::from_value(json)?;
                Ok(to_chunk(response))
            })
        });

        Ok(Box::new(converted_stream))
    }

    async fn embed(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = OpenAiEmbeddingRequest {
            model: model.to_string(),
            input: input.to_vec(),
        };
        let mut response: OpenAiEmbeddingResponse = self.client.post_json("/embeddings", &body).await?;

        if response.data.len() != input.len() {
            return Err(format!(
                "server returned {} embeddings for {} inputs",
                response.data.len(),
                input.len()
            )
            .into());
        }
        response.data.sort_by_key(|e| e.index);
        Ok(response.data.into_iter().map(|e| e.embedding).collect())
    }

    fn set_hooks(&mut self, hooks: Arc<dyn JsonHooks>) {
        self.client.set_hooks(hooks);
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn info() -> ProviderInfo {
        ProviderInfo {
            name: "openai",
            display_name: "OpenAI (GPT-4o, GPT-4)",
            env_vars: vec![
                EnvVar::required("OPENAI_API_KEY", "OpenAI API key"),
            ],
        }
    }
}
