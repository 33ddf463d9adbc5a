// llm/providers/ollama/ollama.rs
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;

use super::api::*;
use crate::chat::{JsonClient, JsonHooks};
use crate::completion::{ChatChunk, Choice, Completion, ExtractThinkContent, GenerationInfo};
use crate::message::{ChatRequest, ContentPart, GenerateOptions, Message};
use crate::provider::{EnvVar, LlmError, LlmProvider, LlmStream, ProviderInfo};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Talks to the native ollama api (`/api/chat`, `/api/embed`, `/api/tags`)
pub struct OllamaProvider {
    client: JsonClient,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>) -> Self {
        let url = base_url.unwrap_or_else(|| OLLAMA_BASE_URL.to_string());
        Self { client: JsonClient::new(url) }
    }

    /// Create Ollama provider from environment variables
    /// Returns None if OLLAMA_BASE_URL is not set
    pub fn from_env() -> Option<Self> {
        std::env::var("OLLAMA_BASE_URL")
            .ok()
            .map(|base_url| Self::new(Some(base_url)))
    }

    pub fn base_url(&self) -> &str {
        &self.client.base_url
    }

    fn build_request(request: &ChatRequest, stream: bool) -> Result<OllamaChatRequest, LlmError> {
        let messages = request
            .messages
            .iter()
            .map(to_ollama_message)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OllamaChatRequest {
            model: request.model.clone(),
            messages,
            stream,
            options: to_ollama_options(&request.options),
        })
    }
}

fn to_ollama_message(message: &Message) -> Result<OllamaMessage, LlmError> {
    let mut images = Vec::new();
    for part in &message.parts {
        match part {
            ContentPart::Text(_) => {}
            ContentPart::Binary { data, .. } => images.push(STANDARD.encode(data)),
            ContentPart::ImageUrl(url) => {
                // ollama only accepts inline images
                let encoded = url
                    .strip_prefix("data:")
                    .and_then(|rest| rest.split_once(";base64,"))
                    .map(|(_, data)| data.to_string())
                    .ok_or_else(|| format!("ollama does not fetch remote images: {}", url))?;
                images.push(encoded);
            }
        }
    }

    Ok(OllamaMessage {
        role: message.role.wire_name().to_string(),
        content: message.text_content(),
        images,
    })
}

fn to_ollama_options(options: &GenerateOptions) -> Option<OllamaOptions> {
    if *options == GenerateOptions::default() {
        return None;
    }
    Some(OllamaOptions {
        temperature: options.temperature,
        top_k: options.top_k,
        seed: options.seed,
        num_predict: options.max_tokens,
    })
}

fn to_chunk(response: OllamaChatResponse) -> Result<ChatChunk, LlmError> {
    if let Some(error) = response.error {
        return Err(format!("ollama: {}", error).into());
    }

    let (stop_reason, generation_info) = if response.done {
        (
            response.done_reason.or_else(|| Some("stop".to_string())),
            Some(GenerationInfo::new(response.prompt_eval_count, response.eval_count)),
        )
    } else {
        (None, None)
    };

    Ok(ChatChunk {
        content: response.message.map(|m| m.content).unwrap_or_default(),
        stop_reason,
        generation_info,
    })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn models(&self) -> Result<Vec<String>, LlmError> {
        let response: OllamaTagsResponse = self.client.get_json("/api/tags").await?;
        Ok(response.models.into_iter().map(|m| m.name).collect())
    }

    async fn default_model(&self) -> Result<String, LlmError> {
        let models = self.models().await?;

        models
            .iter()
            .find(|m| m.to_lowercase().contains("llama"))
            .or_else(|| models.first())
            .cloned()
            .ok_or_else(|| "no model available".into())
    }

    async fn chat(&self, request: ChatRequest) -> Result<Completion, LlmError> {
        let body = Self::build_request(&request, false)?;
        let response: OllamaChatResponse = self.client.post_json("/api/chat", &body).await?;
        let model = if response.model.is_empty() { request.model.clone() } else { response.model.clone() };
        let chunk = to_chunk(response)?;

        Ok(Completion {
            model,
            choices: vec![Choice {
                content: chunk.content,
                stop_reason: chunk.stop_reason,
                reasoning: None,
                generation_info: chunk.generation_info,
            }],
        }
        .extract_think_content())
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<LlmStream, LlmError> {
        let body = Self::build_request(&request, true)?;
        let stream = self.client.post_ndjson_stream("/api/chat", &body).await?;

        let converted_stream = stream.map(|result| {
            result.and_then(|json| {
                let response: OllamaChatResponse = serde_json::from_value(json)?;
                to_chunk(response)
            })
        });

        Ok(Box::new(converted_stream))
    }

    async fn embed(&self, model: &str, input: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = OllamaEmbedRequest {
            model: model.to_string(),
            input: input.to_vec(),
        };
        let response: OllamaEmbedResponse = self.client.post_json("/api/embed", &body).await?;

        if response.embeddings.len() != input.len() {
            return Err(format!(
                "ollama returned {} embeddings for {} inputs",
                response.embeddings.len(),
                input.len()
            )
            .into());
        }
        Ok(response.embeddings)
    }

    fn set_hooks(&mut self, hooks: Arc<dyn JsonHooks>) {
        self.client.set_hooks(hooks);
    }

    fn name(&self) -> &'static str {
        "ollama"
    }

    fn info() -> ProviderInfo {
        ProviderInfo {
            name: "ollama",
            display_name: "Ollama",
            env_vars: vec![
                EnvVar::optional("OLLAMA_BASE_URL", "ollama server url, e.g. http://localhost:11434"),
            ],
        }
    }
}
