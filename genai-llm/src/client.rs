// llm/client.rs
use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;

use crate::chat::JsonHooks;
use crate::completion::{ChatChunk, Completion, CompletionAssembler};
use crate::message::{ChatRequest, GenerateOptions, Message};
use crate::provider::{LlmError, LlmProvider, LlmStream, ProviderInfo};
use crate::providers::{
    ollama::OllamaProvider,
    openai::OpenAiProvider,
};

#[derive(Debug)]
pub struct LlmClient {
    provider: Box<dyn LlmProvider>,
    model: Option<String>,
    embedding_model: Option<String>,
    options: GenerateOptions,
}

/// Provider Factory related method
impl LlmClient {
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: None,
            embedding_model: None,
            options: GenerateOptions::default(),
        }
    }

    /// Create an Ollama provider from environment variables
    /// Returns None if OLLAMA_BASE_URL is not set
    pub fn from_env_ollama() -> Option<Self> {
        OllamaProvider::from_env().map(|provider| Self::new(Box::new(provider)))
    }

    /// Create an OpenAI provider from environment variables
    /// Returns None if required environment variables are not set
    pub fn from_env_openai() -> Option<Self> {
        OpenAiProvider::from_env().map(|provider| Self::new(Box::new(provider)))
    }

    /// Create an OpenAI Compatible provider from environment variables
    /// Returns None if required environment variables are not set
    pub fn from_env_openai_compatible() -> Option<Self> {
        OpenAiProvider::from_env_compatible().map(|provider| Self::new(Box::new(provider)))
    }

    pub fn ollama(base_url: String) -> Self {
        Self::new(Box::new(OllamaProvider::new(Some(base_url))))
    }

    pub fn openai(api_key: String) -> Self {
        Self::new(Box::new(OpenAiProvider::new(api_key)))
    }

    pub fn compatible(api_key: String, base_url: String) -> Self {
        Self::new(Box::new(OpenAiProvider::compatible(api_key, base_url)))
    }

    /// First client that can be configured from the environment.
    /// GENAI_PROVIDER picks one explicitly, otherwise openai, then compatible, then ollama.
    pub fn first_from_env() -> Option<Self> {
        if let Ok(provider) = std::env::var("GENAI_PROVIDER") {
            match provider.as_str() {
                "openai" => return Self::from_env_openai(),
                "openai_compatible" => return Self::from_env_openai_compatible(),
                "ollama" => return Self::from_env_ollama(),
                _ => {} // Fall through to default behavior
            }
        }

        Self::from_env_openai()
            .or_else(Self::from_env_openai_compatible)
            .or_else(Self::from_env_ollama)
    }

    /// Get information about all available providers
    pub fn list_providers() -> Vec<ProviderInfo> {
        vec![
            OllamaProvider::info(),
            OpenAiProvider::compatible_info(),
            OpenAiProvider::info(),
        ]
    }

    /// Create a provider dynamically based on name and environment values
    pub fn create_provider(provider_name: &str, env_values: &HashMap<String, String>) -> Result<Self, LlmError> {
        match provider_name {
            "ollama" => {
                let base_url = env_values
                    .get("OLLAMA_BASE_URL")
                    .cloned()
                    .unwrap_or_else(|| crate::providers::ollama::OLLAMA_BASE_URL.to_string());
                Ok(Self::ollama(base_url))
            }
            "openai" => {
                let api_key = env_values.get("OPENAI_API_KEY")
                    .ok_or("OPENAI_API_KEY not found")?;
                Ok(Self::openai(api_key.clone()))
            }
            "openai_compatible" => {
                let api_key = env_values.get("OPENAI_COMPATIBLE_API_KEY").map_or("", |v| v);
                let base_url = env_values.get("OPENAI_COMPATIBLE_BASE_URL")
                    .ok_or("OPENAI_COMPATIBLE_BASE_URL not found")?;
                Ok(Self::compatible(api_key.to_string(), base_url.clone()))
            }
            _ => Err(format!("Unknown provider: {}", provider_name).into()),
        }
    }

    /// Model used when a call does not name one
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Model used by `embed_documents` / `embed_query`
    pub fn with_embedding_model<S: Into<String>>(mut self, model: S) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    /// Options applied underneath the per-call options
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn JsonHooks>) -> Self {
        self.provider.set_hooks(hooks);
        self
    }
}

/// Provider Delegate
impl LlmClient {
    pub async fn models(&self) -> Result<Vec<String>, LlmError> {
        self.provider.models().await
    }

    /// The model set on the client, else GENAI_MODEL, else whatever the provider prefers
    pub async fn default_model(&self) -> Result<String, LlmError> {
        if let Some(model) = &self.model {
            return Ok(model.clone());
        }
        match std::env::var("GENAI_MODEL") {
            Ok(model) => Ok(model),
            Err(_) => self.provider.default_model().await,
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Get a reference to the underlying provider (for testing)
    pub fn provider(&self) -> &dyn LlmProvider {
        &*self.provider
    }
}

/// Higher level chat client
impl LlmClient {
    async fn request(&self, messages: Vec<Message>, options: &GenerateOptions) -> Result<ChatRequest, LlmError> {
        let model = self.default_model().await?;
        Ok(ChatRequest::new(model, messages).with_options(options.clone().or(&self.options)))
    }

    pub async fn generate(&self, messages: Vec<Message>, options: &GenerateOptions) -> Result<Completion, LlmError> {
        let request = self.request(messages, options).await?;
        self.provider.chat(request).await
    }

    pub async fn generate_stream(&self, messages: Vec<Message>, options: &GenerateOptions) -> Result<LlmStream, LlmError> {
        let request = self.request(messages, options).await?;
        self.provider.chat_stream(request).await
    }

    /// Drive the stream, hand every non-empty chunk to `on_chunk` as it arrives
    /// and return the assembled completion. An error from `on_chunk` stops the stream.
    pub async fn generate_streaming<F>(
        &self,
        messages: Vec<Message>,
        options: &GenerateOptions,
        mut on_chunk: F,
    ) -> Result<Completion, LlmError>
    where
        F: FnMut(&ChatChunk) -> Result<(), LlmError> + Send,
    {
        let request = self.request(messages, options).await?;
        let mut assembler = CompletionAssembler::new(request.model.clone());
        let mut stream = self.provider.chat_stream(request).await?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !chunk.content.is_empty() {
                on_chunk(&chunk)?;
            }
            assembler.push(&chunk);
        }

        Ok(assembler.finish())
    }
}
