use serde::{Deserialize, Serialize};

/// Who authored a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
    Ai,
    Tool,
}

impl Role {
    /// Role name as understood by ollama and openai compatible endpoints
    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Human => "user",
            Role::Ai => "assistant",
            Role::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentPart {
    Text(String),
    Binary { mime_type: String, data: Vec<u8> },
    ImageUrl(String),
}

/// A single conversation entry. Conversations are append-only `Vec<Message>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl Message {
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Self {
        Self { role, parts }
    }

    pub fn text<S: Into<String>>(role: Role, text: S) -> Self {
        Self::new(role, vec![ContentPart::Text(text.into())])
    }

    pub fn system<S: Into<String>>(text: S) -> Self {
        Self::text(Role::System, text)
    }

    pub fn human<S: Into<String>>(text: S) -> Self {
        Self::text(Role::Human, text)
    }

    pub fn ai<S: Into<String>>(text: S) -> Self {
        Self::text(Role::Ai, text)
    }

    pub fn tool<S: Into<String>>(text: S) -> Self {
        Self::text(Role::Tool, text)
    }

    /// Add an image given as raw bytes
    pub fn with_binary<S: Into<String>>(mut self, mime_type: S, data: Vec<u8>) -> Self {
        self.parts.push(ContentPart::Binary { mime_type: mime_type.into(), data });
        self
    }

    /// Add an image referenced by url
    pub fn with_image_url<S: Into<String>>(mut self, url: S) -> Self {
        self.parts.push(ContentPart::ImageUrl(url.into()));
        self
    }

    /// All text parts joined with a single space
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Sampling parameters forwarded to the model server.
///
/// Every field defaults to `None`, meaning the server-side default applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub seed: Option<i64>,
    pub max_tokens: Option<u32>,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Fill the unset fields of `self` from `defaults`
    pub fn or(self, defaults: &GenerateOptions) -> Self {
        Self {
            temperature: self.temperature.or(defaults.temperature),
            top_k: self.top_k.or(defaults.top_k),
            seed: self.seed.or(defaults.seed),
            max_tokens: self.max_tokens.or(defaults.max_tokens),
        }
    }
}

/// What a provider receives for a single model call
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub options: GenerateOptions,
}

impl ChatRequest {
    pub fn new<S: Into<String>>(model: S, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_skips_images() {
        let message = Message::human("What is in")
            .with_binary("image/jpeg", vec![1, 2, 3])
            .with_image_url("https://example.com/cat.jpeg");
        assert_eq!(message.parts.len(), 3);
        assert_eq!(message.text_content(), "What is in");
    }

    #[test]
    fn test_options_fallback() {
        let defaults = GenerateOptions::new().temperature(0.5).seed(42);
        let merged = GenerateOptions::new().temperature(0.0).top_k(1).or(&defaults);
        assert_eq!(merged.temperature, Some(0.0));
        assert_eq!(merged.top_k, Some(1));
        assert_eq!(merged.seed, Some(42));
        assert_eq!(merged.max_tokens, None);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(Role::Human.wire_name(), "user");
        assert_eq!(Role::Ai.wire_name(), "assistant");
    }
}
