use std::io::Write;
use std::sync::Arc;

use genai_core::rag::{Document, SearchOptions};
use genai_core::WrapErr;
use genai_llm::{Embedder, Message};

use super::augmented::augmented_options;
use crate::provision::{model_client, vector_store, Cleanup, CliResult, Connection, CHAT_MODEL, EMBEDDING_MODEL};

pub const SEARCH_QUERY: &str = "What is my favorite sport?";
pub const SCORE_THRESHOLD: f32 = 0.80;

pub fn rag_prompt(relevant: &str) -> String {
    format!("\nWhat is your favourite sport?\n\nAnswer the question considering the following relevant content:\n{}\n", relevant)
}

pub async fn run(connection: &Connection) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let result = rag(connection, &mut cleanup).await;
    cleanup.finish(result).await
}

async fn rag(connection: &Connection, cleanup: &mut Cleanup) -> CliResult<()> {
    let embedding_client = model_client(connection, EMBEDDING_MODEL, cleanup).await?;
    let embedder: Arc<dyn Embedder> = embedding_client;
    let store = vector_store(embedder, cleanup).await?;

    store
        .add_documents(&[Document::new("I like football"), Document::new("The weather is good today.")])
        .await
        .wrap("add documents")?;

    let relevant = store
        .similarity_search(SEARCH_QUERY, 1, &SearchOptions::with_score_threshold(SCORE_THRESHOLD))
        .await
        .wrap("similarity search")?;
    let Some(best) = relevant.first() else {
        println!("No relevant content found");
        return Ok(());
    };

    let chat_client = model_client(connection, CHAT_MODEL, cleanup).await?;
    let prompt = rag_prompt(&best.page_content);
    println!("{}", prompt);

    let mut stdout = std::io::stdout();
    chat_client
        .generate_streaming(vec![Message::human(prompt)], &augmented_options(), |chunk| {
            write!(stdout, "{}", chunk.content)?;
            stdout.flush()?;
            Ok(())
        })
        .await
        .wrap("llm generate content")?;
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_prompt() {
        assert_eq!(
            rag_prompt("I like football"),
            "\nWhat is your favourite sport?\n\nAnswer the question considering the following relevant content:\nI like football\n"
        );
    }
}
