use std::sync::Arc;

use async_trait::async_trait;
use genai_llm::{LlmClient, Message};
use serde::{Deserialize, Serialize};

use crate::ai::chatter::deterministic_options;
use crate::error::{GenAiResult, WrapErr};

pub const EVALUATOR_SYSTEM_PROMPT: &str = r#"
### Instructions
You are a strict validator.
You will be provided with a question, an answer, and a reference.
Your task is to validate whether the answer is correct for the given question, based on the reference.

Follow these instructions:
- Respond only 'yes', 'no' or 'unsure' and always include the reason for your response
- Respond with 'yes' if the answer is correct
- Respond with 'no' if the answer is incorrect
- If you are unsure, simply respond with 'unsure'
- Respond with 'no' if the answer is not clear or concise
- Respond with 'no' if the answer is not based on the reference

Your response must be a json object with the following structure:
{
	"response": "yes",
	"reason": "The answer is correct because it is based on the reference provided."
}

### Example
Question: Is Madrid the capital of Spain?
Answer: No, it's Barcelona.
Reference: The capital of Spain is Madrid
###
Response: {
	"response": "no",
	"reason": "The answer is incorrect because the reference states that the capital of Spain is Madrid."
}
"#;

/// Verdict returned by the evaluator model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub response: String,
    pub reason: String,
}

impl Evaluation {
    pub fn is_yes(&self) -> bool {
        self.response.trim().eq_ignore_ascii_case("yes")
    }

    /// Decode the model output, tolerating prose or code fences around the JSON object
    pub fn parse(raw: &str) -> GenAiResult<Self> {
        let start = raw.find('{');
        let end = raw.rfind('}');
        let json = match (start, end) {
            (Some(start), Some(end)) if start < end => &raw[start..=end],
            _ => raw,
        };
        serde_json::from_str(json).wrap("decode evaluation")
    }
}

pub fn user_prompt(question: &str, answer: &str, reference: &str) -> String {
    format!("\n###\nQuestion: {question}\n###\nAnswer: {answer}\n###\nReference: {reference}\n###\n")
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Raw model verdict for `answer` against `reference`
    async fn evaluate(&self, question: &str, answer: &str, reference: &str) -> GenAiResult<String>;
}

/// Asks a model whether an answer matches a reference
pub struct EvaluatorAgent {
    client: Arc<LlmClient>,
    system_message: String,
}

impl EvaluatorAgent {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self {
            client,
            system_message: EVALUATOR_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Instructions and the filled-in prompt, both as human messages
    pub fn messages(&self, question: &str, answer: &str, reference: &str) -> Vec<Message> {
        vec![
            Message::human(self.system_message.clone()),
            Message::human(user_prompt(question, answer, reference)),
        ]
    }

    pub async fn evaluation(&self, question: &str, answer: &str, reference: &str) -> GenAiResult<Evaluation> {
        let raw = self.evaluate(question, answer, reference).await?;
        Evaluation::parse(&raw)
    }
}

#[async_trait]
impl Evaluator for EvaluatorAgent {
    async fn evaluate(&self, question: &str, answer: &str, reference: &str) -> GenAiResult<String> {
        let completion = self
            .client
            .generate(self.messages(question, answer, reference), &deterministic_options())
            .await
            .wrap("llm generate content")?;
        Ok(completion.content())
    }
}
