use async_trait::async_trait;
use genai_llm::chat::JsonClient;
use genai_llm::{Dispatch, LlmError, Message, ToolCall, ToolDescription, ToolHandler};
use tracing::info;

use super::structs::{FetchPokemonParams, FinalResponseParams, Pokemon};
use crate::error::{GenAiError, GenAiResult, WrapErr};

pub const POKEAPI_URL: &str = "https://pokeapi.co";
pub const FETCH_POKEAPI: &str = "fetchPokeAPI";
pub const FINAL_RESPONSE: &str = "finalResponse";

fn schema<T: schemars::JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}

pub struct FetchPokeApiTool;

impl ToolDescription for FetchPokeApiTool {
    fn name(&self) -> &'static str {
        FETCH_POKEAPI
    }

    fn description(&self) -> &'static str {
        "A wrapper around PokeAPI. Useful for when you need to answer general questions about pokemons. Input should be a pokemon name in lowercase, without quotes."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema::<FetchPokemonParams>()
    }

    fn input_hint(&self) -> Option<&'static str> {
        Some(r#"{"pokemon": <pokemon name>}"#)
    }
}

pub struct FinalResponseTool;

impl ToolDescription for FinalResponseTool {
    fn name(&self) -> &'static str {
        FINAL_RESPONSE
    }

    fn description(&self) -> &'static str {
        "Provide the final response to the user query"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema::<FinalResponseParams>()
    }

    fn input_hint(&self) -> Option<&'static str> {
        Some(r#"{"response": <final response to the user query including the reasons>}"#)
    }
}

/// Minimal PokeAPI client
#[derive(Debug, Clone)]
pub struct PokeApi {
    client: JsonClient,
}

impl Default for PokeApi {
    fn default() -> Self {
        Self::new(POKEAPI_URL)
    }
}

impl PokeApi {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: JsonClient::new(base_url.trim_end_matches('/')).with_header("User-Agent", "pokemon-tool"),
        }
    }

    pub async fn pokemon(&self, name: &str) -> GenAiResult<Pokemon> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(GenAiError::Tool("pokemon name is empty".to_string()));
        }
        self.client
            .get_json::<Pokemon>(&format!("/api/v2/pokemon/{}", name))
            .await
            .wrap(&format!("fetch pokemon {}", name))
    }

    /// One line description of the pokemon for the model
    pub async fn fetch(&self, name: &str) -> GenAiResult<String> {
        Ok(self.pokemon(name).await?.summary())
    }
}

/// Handles `fetchPokeAPI` and `finalResponse` calls
#[derive(Debug, Clone, Default)]
pub struct PokemonHandler {
    api: PokeApi,
}

impl PokemonHandler {
    pub fn new(api: PokeApi) -> Self {
        Self { api }
    }

    pub fn toolbox() -> genai_llm::ToolBox {
        vec![
            std::sync::Arc::new(FetchPokeApiTool),
            std::sync::Arc::new(FinalResponseTool),
        ]
    }
}

fn params<T: serde::de::DeserializeOwned>(call: &ToolCall) -> Result<T, LlmError> {
    serde_json::from_value(serde_json::Value::Object(call.tool_input.clone()))
        .map_err(|e| GenAiError::Tool(format!("invalid input for {}: {}", call.tool, e)).into())
}

#[async_trait]
impl ToolHandler for PokemonHandler {
    async fn call(&self, call: &ToolCall) -> Result<Dispatch, LlmError> {
        match call.tool.as_str() {
            FETCH_POKEAPI => {
                let params: FetchPokemonParams = params(call)?;
                let summary = self.api.fetch(&params.pokemon).await?;
                info!(target: "genai::tools", "{}: {}", params.pokemon, summary);
                Ok(Dispatch::Continue(Message::tool(summary)))
            }
            FINAL_RESPONSE => {
                let params: FinalResponseParams = params(call)?;
                Ok(Dispatch::Final(params.response))
            }
            other => Err(GenAiError::Tool(format!("no handler for {}", other)).into()),
        }
    }
}
