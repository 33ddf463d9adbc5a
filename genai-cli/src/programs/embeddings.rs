use genai_core::WrapErr;
use genai_llm::{cosine_similarity, Embedder, SimilarityError};

use crate::provision::{model_client, Cleanup, CliResult, Connection, EMBEDDING_MODEL};

pub const SENTENCES: [&str; 4] = [
    "A cat is a small domesticated carnivorous mammal",
    "A tiger is a large carnivorous feline mammal",
    "Testcontainers is a Go package that supports JUnit tests, providing lightweight, throwaway instances of common databases, web browsers, or anything else that can run in a Docker container",
    "Docker is a platform designed to help developers build, share, and run container applications. We handle the tedious setup, so you can focus on the code.",
];

/// `i ~ j = 0.xx` for every pair with i <= j
pub fn similarity_lines(vectors: &[Vec<f32>]) -> Result<Vec<String>, SimilarityError> {
    let mut lines = Vec::new();
    for i in 0..vectors.len() {
        for j in i..vectors.len() {
            let similarity = cosine_similarity(&vectors[i], &vectors[j])?;
            lines.push(format!("{} ~ {} = {:.2}", i, j, similarity));
        }
    }
    Ok(lines)
}

pub async fn run(connection: &Connection) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let result = embeddings(connection, &mut cleanup).await;
    cleanup.finish(result).await
}

async fn embeddings(connection: &Connection, cleanup: &mut Cleanup) -> CliResult<()> {
    let client = model_client(connection, EMBEDDING_MODEL, cleanup).await?;

    let documents: Vec<String> = SENTENCES.iter().map(|s| s.to_string()).collect();
    let vectors = client.embed_documents(&documents).await.wrap("embed documents")?;

    println!("Similarities:");
    for line in similarity_lines(&vectors)? {
        println!("{}", line);
    }
    Ok(())
}
