use std::io::Write;
use std::sync::Arc;

use genai_core::WrapErr;
use genai_llm::{GenerateOptions, LlmClient, Message, RequestLogger};

use crate::provision::{run_ollama, Cleanup, CliResult, Connection, CHAT_MODEL};

pub async fn run(connection: &Connection) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let result = streaming(connection, &mut cleanup).await;
    cleanup.finish(result).await
}

async fn streaming(connection: &Connection, cleanup: &mut Cleanup) -> CliResult<()> {
    let url = match &connection.server_url {
        Some(url) => url.clone(),
        None => run_ollama(CHAT_MODEL, cleanup).await?,
    };
    let model = connection.model.clone().unwrap_or_else(|| CHAT_MODEL.model.to_string());
    // every request body is printed before it is sent
    let client = LlmClient::ollama(url)
        .with_model(model)
        .with_hooks(Arc::new(RequestLogger::new()));

    let messages = vec![Message::human(
        "Give me a detailed and long explanation of why Testcontainers for Rust is great",
    )];
    let mut stdout = std::io::stdout();
    client
        .generate_streaming(messages, &GenerateOptions::default(), |chunk| {
            write!(stdout, "{}", chunk.content)?;
            stdout.flush()?;
            Ok(())
        })
        .await
        .wrap("llm generate content")?;
    println!();
    Ok(())
}
