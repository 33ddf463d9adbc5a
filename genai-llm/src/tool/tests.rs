use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chat::JsonHooks;
use crate::completion::{Choice, Completion};
use crate::message::{ChatRequest, Message, Role};
use crate::provider::{LlmError, LlmProvider, LlmStream, ProviderInfo};
use crate::tool::*;
use crate::LlmClient;

/// Answers with canned responses and remembers every request it got
struct ScriptedProvider {
    answers: Mutex<VecDeque<String>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedProvider {
    fn new(answers: &[&str]) -> (Self, Arc<Mutex<Vec<ChatRequest>>>) {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let provider = Self {
            answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
            requests: requests.clone(),
        };
        (provider, requests)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn models(&self) -> Result<Vec<String>, LlmError> {
        Ok(vec!["scripted".to_string()])
    }

    async fn chat(&self, request: ChatRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request);
        let answer = self.answers.lock().unwrap().pop_front().ok_or("script exhausted")?;
        Ok(Completion {
            model: "scripted".to_string(),
            choices: vec![Choice { content: answer, ..Default::default() }],
        })
    }

    async fn chat_stream(&self, _request: ChatRequest) -> Result<LlmStream, LlmError> {
        Err("not scripted".into())
    }

    async fn embed(&self, _model: &str, _input: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Err("not scripted".into())
    }

    fn set_hooks(&mut self, _hooks: Arc<dyn JsonHooks>) {}

    fn name(&self) -> &'static str {
        "scripted"
    }

    fn info() -> ProviderInfo {
        ProviderInfo { name: "scripted", display_name: "Scripted", env_vars: vec![] }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct LookupParams {
    /// The pokemon name in lowercase
    pokemon: String,
}

struct LookupTool;

impl ToolDescription for LookupTool {
    fn name(&self) -> &'static str {
        "lookup"
    }

    fn description(&self) -> &'static str {
        "Look a pokemon up"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(LookupParams)).unwrap_or_default()
    }

    fn input_hint(&self) -> Option<&'static str> {
        Some(r#"{"pokemon": <pokemon name>}"#)
    }
}

struct AnswerTool;

impl ToolDescription for AnswerTool {
    fn name(&self) -> &'static str {
        "answer"
    }

    fn description(&self) -> &'static str {
        "Provide the final response"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"response": {"type": "string"}}, "required": ["response"]})
    }
}

struct Handler;

#[async_trait]
impl ToolHandler for Handler {
    async fn call(&self, call: &ToolCall) -> Result<Dispatch, LlmError> {
        match call.tool.as_str() {
            "lookup" => {
                let name = call.input_str("pokemon").ok_or("missing pokemon")?;
                Ok(Dispatch::Continue(Message::tool(format!("{}: 10 moves", name))))
            }
            "answer" => Ok(Dispatch::Final(call.input_str("response").unwrap_or_default().to_string())),
            other => Err(format!("unexpected tool {}", other).into()),
        }
    }
}

fn tools() -> ToolBox {
    vec![Arc::new(LookupTool), Arc::new(AnswerTool)]
}

fn texts_of(messages: &[Message], role: Role) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.role == role)
        .map(|m| m.text_content())
        .collect()
}

#[test]
fn test_parse_tool_calls() {
    let calls = parse_tool_calls(r#"[{"tool": "lookup", "tool_input": {"pokemon": "gengar"}}]"#).unwrap();
    assert_eq!(calls, vec![ToolCall::new("lookup", json!({"pokemon": "gengar"}))]);

    let fenced = "```json\n[{\"tool\": \"answer\", \"tool_input\": {\"response\": \"ok\"}}]\n```";
    assert_eq!(parse_tool_calls(fenced).unwrap()[0].input_str("response"), Some("ok"));

    assert!(parse_tool_calls("Gengar has more moves.").is_none());
    assert!(parse_tool_calls(r#"{"tool": "lookup", "tool_input": {}}"#).is_none());
    assert!(parse_tool_calls("[]").is_none());
}

#[test]
fn test_system_prompt_lists_tools() {
    let prompt = tool_system_prompt(&tools());
    assert!(prompt.starts_with("You have access to the following tools:"));
    assert!(prompt.contains(r#""name":"lookup""#));
    assert!(prompt.contains(r#""tool_input": <parameters for the tool matching the above JSON schema>"#));
    assert!(prompt.contains(r#"- when calling lookup: {"pokemon": <pokemon name>}"#));
    assert!(!prompt.contains("when calling answer"));
}

#[test]
fn test_contains_tool() {
    assert!(tools().contains_tool("lookup"));
    assert!(!tools().contains_tool("fetch"));
}

#[tokio::test]
async fn test_loop_reaches_final_answer() {
    let (provider, requests) = ScriptedProvider::new(&[
        r#"[{"tool": "lookup", "tool_input": {"pokemon": "haunter"}}, {"tool": "lookup", "tool_input": {"pokemon": "gengar"}}]"#,
        r#"[{"tool": "answer", "tool_input": {"response": "Gengar"}}]"#,
    ]);
    let client = LlmClient::new(Box::new(provider)).with_model("scripted");

    let answer = ToolLoop::new(&client, tools(), &Handler).run("Who has more moves?").await.unwrap();
    assert_eq!(answer, "Gengar");

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    let second = &requests[1].messages;
    assert_eq!(second[0].role, Role::System);
    assert_eq!(texts_of(second, Role::Tool), vec!["haunter: 10 moves", "gengar: 10 moves"]);
}

#[tokio::test]
async fn test_loop_gives_up_after_three_attempts() {
    let (provider, requests) = ScriptedProvider::new(&["I think Gengar.", "Gengar!", "Really, Gengar.", "unused"]);
    let client = LlmClient::new(Box::new(provider)).with_model("scripted");

    let err = ToolLoop::new(&client, tools(), &Handler).run("Who has more moves?").await.unwrap_err();
    assert!(matches!(err, ToolLoopError::NoFinalAnswer { attempts: 3 }));

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 3);
    // one corrective message per failed attempt, the third one never reached the model
    let last = &requests[2].messages;
    let corrections: Vec<_> = texts_of(last, Role::Human)
        .into_iter()
        .filter(|t| t == NOT_UNDERSTOOD)
        .collect();
    assert_eq!(corrections.len(), 2);
    assert_eq!(last.len(), 2 + 2 * 2);
}

#[tokio::test]
async fn test_unknown_tool_is_reported_to_the_model() {
    let (provider, requests) = ScriptedProvider::new(&[
        r#"[{"tool": "fetchPokeAPI", "tool_input": {"pokemon": "gengar"}}]"#,
        r#"[{"tool": "answer", "tool_input": {"response": "done"}}]"#,
    ]);
    let client = LlmClient::new(Box::new(provider)).with_model("scripted");

    let answer = ToolLoop::new(&client, tools(), &Handler).run("q").await.unwrap();
    assert_eq!(answer, "done");

    let requests = requests.lock().unwrap();
    assert_eq!(texts_of(&requests[1].messages, Role::Human), vec!["q", UNKNOWN_TOOL]);
}

#[tokio::test]
async fn test_model_error_propagates() {
    let (provider, _) = ScriptedProvider::new(&[]);
    let client = LlmClient::new(Box::new(provider)).with_model("scripted");

    let err = ToolLoop::new(&client, tools(), &Handler).run("q").await.unwrap_err();
    assert!(matches!(err, ToolLoopError::Llm(_)));
}
