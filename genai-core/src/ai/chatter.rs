use std::sync::Arc;

use async_trait::async_trait;
use genai_llm::{GenerateOptions, LlmClient, Message};
use tracing::debug;

use crate::error::{GenAiResult, WrapErr};
use crate::rag::Document;

pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant.
Your task is to answer questions by providing clear and concise answers.

Follow these instructions:
- Your answer should be clear and concise, maximum 3-4 sentences
- If you do not know the answer, you can say so
- Use the information provided to answer, do not make up information
- Important: Do not mention that you have been provided with additional information or documents";

#[async_trait]
pub trait Chatter: Send + Sync {
    async fn chat(&self, user_message: &str) -> GenAiResult<String>;
}

/// Answers with a fixed system prompt, optionally grounded on retrieved documents
pub struct ChatService {
    client: Arc<LlmClient>,
    system_message: String,
    rag_context: Option<Vec<Document>>,
}

impl ChatService {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self {
            client,
            system_message: CHAT_SYSTEM_PROMPT.to_string(),
            rag_context: None,
        }
    }

    /// Documents sent to the model as extra system messages
    pub fn with_rag_context(mut self, documents: Vec<Document>) -> Self {
        self.rag_context = Some(documents);
        self
    }

    pub fn with_system_message<S: Into<String>>(mut self, system_message: S) -> Self {
        self.system_message = system_message.into();
        self
    }

    pub fn messages(&self, user_message: &str) -> Vec<Message> {
        let mut messages = vec![Message::system(self.system_message.clone())];
        if let Some(documents) = &self.rag_context {
            messages.extend(documents.iter().map(|doc| Message::system(doc.page_content.clone())));
        }
        messages.push(Message::human(user_message));
        messages
    }
}

/// Deterministic sampling shared by the services
pub fn deterministic_options() -> GenerateOptions {
    GenerateOptions::new().temperature(0.0).top_k(1).seed(42)
}

#[async_trait]
impl Chatter for ChatService {
    async fn chat(&self, user_message: &str) -> GenAiResult<String> {
        let messages = self.messages(user_message);
        debug!(target: "genai::chat", "chat with {} messages", messages.len());
        let completion = self
            .client
            .generate(messages, &deterministic_options())
            .await
            .wrap("llm generate content")?;
        Ok(completion.content())
    }
}
