use genai_core::WrapErr;
use genai_llm::{GenerateOptions, LlmClient, Message};

use crate::provision::{model_client, Cleanup, CliResult, Connection, SHARED_CHAT_MODEL};

pub const QUESTION: &str = "What is the current topic of the conference?";

pub fn augmented_question(question: &str) -> String {
    format!(
        "{question}
Use the following bullet points to answer the question:
- The Conference is about how to leverage Testcontainers for building Generative AI applications.
- The meeting will explore how Testcontainers can be used to create a seamless development environment for AI projects.
Do not indicate that you have been given any additional information."
    )
}

/// Near greedy decoding so both answers differ only by the context
pub fn augmented_options() -> GenerateOptions {
    GenerateOptions::new().temperature(0.0001).top_k(1)
}

pub async fn run(connection: &Connection) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let result = augmented(connection, &mut cleanup).await;
    cleanup.finish(result).await
}

async fn augmented(connection: &Connection, cleanup: &mut Cleanup) -> CliResult<()> {
    let client = model_client(connection, SHARED_CHAT_MODEL, cleanup).await?;

    let original = answer(&client, QUESTION).await.wrap("llm generate original content")?;
    println!("\nOriginal completion:");
    println!("{}", original);

    let augmented = answer(&client, &augmented_question(QUESTION))
        .await
        .wrap("llm generate augmented content")?;
    println!("\nAugmented completion:");
    println!("{}", augmented);
    Ok(())
}

async fn answer(client: &LlmClient, prompt: &str) -> Result<String, genai_llm::LlmError> {
    let completion = client.generate(vec![Message::system(prompt)], &augmented_options()).await?;
    Ok(completion.texts().join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_augmented_question_keeps_the_question_first() {
        let prompt = augmented_question(QUESTION);
        assert!(prompt.starts_with(QUESTION));
        assert!(prompt.contains("- The Conference is about how to leverage Testcontainers"));
        assert!(prompt.ends_with("Do not indicate that you have been given any additional information."));
    }
}
