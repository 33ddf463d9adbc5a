use async_trait::async_trait;
use genai_llm::provider::{LlmError, LlmProvider, LlmStream, ProviderInfo};
use genai_llm::{ChatRequest, Choice, Completion, JsonHooks, LlmClient, Role, ToolCall, ToolDescription, ToolHandler, ToolLoop};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use genai_llm::Dispatch;

fn gengar() -> serde_json::Value {
    json!({
        "id": 94,
        "name": "gengar",
        "moves": [
            {"move": {"name": "mega-punch", "url": "https://pokeapi.co/api/v2/move/5/"}},
            {"move": {"name": "fire-punch", "url": "https://pokeapi.co/api/v2/move/7/"}},
            {"move": {"name": "ice-punch", "url": "https://pokeapi.co/api/v2/move/8/"}}
        ],
        "types": [
            {"slot": 1, "type": {"name": "ghost"}},
            {"slot": 2, "type": {"name": "poison"}}
        ],
        "weight": 405
    })
}

async fn pokeapi() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/pokemon/gengar"))
        .and(header("User-Agent", "pokemon-tool"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gengar()))
        .mount(&server)
        .await;
    server
}

#[test]
fn test_tool_descriptions() {
    let tools = PokemonHandler::toolbox();
    assert_eq!(tools[0].name(), "fetchPokeAPI");
    assert_eq!(tools[1].name(), "finalResponse");

    let schema = FetchPokeApiTool.parameters_schema();
    assert_eq!(schema["properties"]["pokemon"]["type"], "string");
    assert_eq!(schema["required"], json!(["pokemon"]));
    assert_eq!(FinalResponseTool.parameters_schema()["required"], json!(["response"]));
}

#[tokio::test]
async fn test_fetch_summary() {
    let server = pokeapi().await;
    let api = PokeApi::new(server.uri());

    let summary = api.fetch("Gengar").await.unwrap();
    assert_eq!(
        summary,
        "ID: 94, MovesCount: 3, Moves: [mega-punch, fire-punch, ice-punch], Types: [ghost, poison]"
    );
}

#[tokio::test]
async fn test_fetch_unknown_pokemon() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let err = PokeApi::new(server.uri()).fetch("missingno").await.unwrap_err();
    assert!(err.to_string().starts_with("fetch pokemon missingno"), "{}", err);
}

#[tokio::test]
async fn test_handler_dispatch() {
    let server = pokeapi().await;
    let handler = PokemonHandler::new(PokeApi::new(server.uri()));

    let fetched = handler
        .call(&ToolCall::new("fetchPokeAPI", json!({"pokemon": "gengar"})))
        .await
        .unwrap();
    match fetched {
        Dispatch::Continue(message) => {
            assert_eq!(message.role, Role::Tool);
            assert!(message.text_content().starts_with("ID: 94, MovesCount: 3"));
        }
        other => panic!("unexpected {:?}", other),
    }

    let last = handler
        .call(&ToolCall::new("finalResponse", json!({"response": "Gengar"})))
        .await
        .unwrap();
    assert_eq!(last, Dispatch::Final("Gengar".to_string()));

    assert!(handler.call(&ToolCall::new("finalResponse", json!({}))).await.is_err());
}

/// Replays canned answers in order
struct Replay {
    answers: Mutex<Vec<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

#[async_trait]
impl LlmProvider for Replay {
    async fn models(&self) -> Result<Vec<String>, LlmError> {
        Ok(vec!["llama3.2:3b".to_string()])
    }

    async fn chat(&self, request: ChatRequest) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(request);
        let answer = self.answers.lock().unwrap().remove(0);
        Ok(Completion {
            model: "llama3.2:3b".to_string(),
            choices: vec![Choice { content: answer, ..Default::default() }],
        })
    }

    async fn chat_stream(&self, _request: ChatRequest) -> Result<LlmStream, LlmError> {
        Err("not supported".into())
    }

    async fn embed(&self, _model: &str, _input: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        Err("not supported".into())
    }

    fn set_hooks(&mut self, _hooks: Arc<dyn JsonHooks>) {}

    fn name(&self) -> &'static str {
        "replay"
    }

    fn info() -> ProviderInfo {
        ProviderInfo { name: "replay", display_name: "Replay", env_vars: vec![] }
    }
}

#[tokio::test]
async fn test_which_pokemon_has_more_moves() {
    let server = pokeapi().await;
    let provider = Replay {
        answers: Mutex::new(vec![
            r#"[{"tool": "fetchPokeAPI", "tool_input": {"pokemon": "gengar"}}]"#.to_string(),
            r#"[{"tool": "finalResponse", "tool_input": {"response": "Gengar has more moves"}}]"#.to_string(),
        ]),
        requests: Mutex::new(Vec::new()),
    };
    let client = LlmClient::new(Box::new(provider)).with_model("llama3.2:3b");
    let handler = PokemonHandler::new(PokeApi::new(server.uri()));

    let answer = ToolLoop::new(&client, PokemonHandler::toolbox(), &handler)
        .run("Which pokemon has more moves, Haunter or Gengar?")
        .await
        .unwrap();
    assert_eq!(answer, "Gengar has more moves");
}
