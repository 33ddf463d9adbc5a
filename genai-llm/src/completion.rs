use std::sync::LazyLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

static THINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("think regex is valid"));

/// Token accounting reported by the server, when it reports any
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

impl GenerationInfo {
    pub fn new(prompt_tokens: Option<u32>, completion_tokens: Option<u32>) -> Self {
        let total_tokens = match (prompt_tokens, completion_tokens) {
            (Some(prompt), Some(completion)) => Some(prompt + completion),
            _ => None,
        };
        Self { prompt_tokens, completion_tokens, total_tokens }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub content: String,
    pub stop_reason: Option<String>,
    /// text found inside <think> tags, removed from `content`
    pub reasoning: Option<String>,
    pub generation_info: Option<GenerationInfo>,
}

/// A finished model response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub model: String,
    pub choices: Vec<Choice>,
}

impl Completion {
    /// Content of every choice, in order
    pub fn texts(&self) -> Vec<String> {
        self.choices.iter().map(|c| c.content.clone()).collect()
    }

    /// Concatenated content of every choice
    pub fn content(&self) -> String {
        self.choices.iter().map(|c| c.content.as_str()).collect()
    }

    /// Sum of the total token count of every choice, missing counts count as zero
    pub fn total_tokens(&self) -> u32 {
        self.choices
            .iter()
            .filter_map(|c| c.generation_info.as_ref())
            .filter_map(|info| info.total_tokens)
            .sum()
    }
}

/// One piece of a streamed response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    pub content: String,
    pub stop_reason: Option<String>,
    pub generation_info: Option<GenerationInfo>,
}

/// Accumulates streamed chunks into a single choice completion
#[derive(Debug, Default)]
pub struct CompletionAssembler {
    model: String,
    content: String,
    stop_reason: Option<String>,
    generation_info: Option<GenerationInfo>,
}

impl CompletionAssembler {
    pub fn new<S: Into<String>>(model: S) -> Self {
        Self { model: model.into(), ..Default::default() }
    }

    pub fn push(&mut self, chunk: &ChatChunk) {
        self.content.push_str(&chunk.content);
        if chunk.stop_reason.is_some() {
            self.stop_reason = chunk.stop_reason.clone();
        }
        if chunk.generation_info.is_some() {
            self.generation_info = chunk.generation_info.clone();
        }
    }

    pub fn finish(self) -> Completion {
        Completion {
            model: self.model,
            choices: vec![Choice {
                content: self.content,
                stop_reason: self.stop_reason,
                reasoning: None,
                generation_info: self.generation_info,
            }],
        }
        .extract_think_content()
    }
}

pub trait ExtractThinkContent {
    /// Move <think> content out of the answer into `reasoning`
    fn extract_think_content(self) -> Completion;
}

impl ExtractThinkContent for Completion {
    fn extract_think_content(mut self) -> Completion {
        for choice in &mut self.choices {
            let reasoning = THINK_REGEX
                .captures(&choice.content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string());
            if let Some(reasoning) = reasoning {
                choice.reasoning = Some(reasoning);
                choice.content = THINK_REGEX.replace_all(&choice.content, "").trim().to_string();
            }
        }
        self
    }
}
