use genai_core::WrapErr;
use genai_llm::{GenerateOptions, Message};

use crate::provision::{model_client, Cleanup, CliResult, Connection, CHAT_MODEL};

pub async fn run(connection: &Connection) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let result = hello_world(connection, &mut cleanup).await;
    cleanup.finish(result).await
}

async fn hello_world(connection: &Connection, cleanup: &mut Cleanup) -> CliResult<()> {
    let client = model_client(connection, CHAT_MODEL, cleanup).await?;

    let messages = vec![
        Message::system("You are a fellow Rust developer."),
        Message::human("Provide 3 short bullet points explaining why Rust is awesome"),
    ];
    let completion = client
        .generate(messages, &GenerateOptions::default())
        .await
        .wrap("llm generate content")?;

    for choice in &completion.choices {
        println!("{}", choice.content);
        if let Some(reason) = &choice.stop_reason {
            println!("Stop reason: {}", reason);
        }
    }
    Ok(())
}
