use genai_core::tools::{PokeApi, PokemonHandler};
use genai_llm::ToolLoop;
use tracing::info;

use crate::provision::{model_client, Cleanup, CliResult, Connection, TOOLS_CHAT_MODEL};

pub const QUESTION: &str = "Which pokemon has more moves, Haunter or Gengar?";

pub async fn run(connection: &Connection, question: Option<String>, pokeapi_url: Option<String>) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let result = functions(connection, question, pokeapi_url, &mut cleanup).await;
    cleanup.finish(result).await
}

async fn functions(
    connection: &Connection,
    question: Option<String>,
    pokeapi_url: Option<String>,
    cleanup: &mut Cleanup,
) -> CliResult<()> {
    let question = question.unwrap_or_else(|| QUESTION.to_string());
    info!("Question: {}", question);

    let client = model_client(connection, TOOLS_CHAT_MODEL, cleanup).await?;
    let api = pokeapi_url.map(PokeApi::new).unwrap_or_default();
    let handler = PokemonHandler::new(api);

    let answer = ToolLoop::new(&client, PokemonHandler::toolbox(), &handler)
        .run(&question)
        .await?;

    info!("Final response: {}", answer);
    println!("{}", answer);
    Ok(())
}
