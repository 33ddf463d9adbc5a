use std::sync::Arc;

use genai_core::ai::{ChatService, Chatter, EvaluatorAgent};
use genai_core::rag::{ingest, SearchOptions, TextSplitter, KNOWLEDGE};
use genai_core::WrapErr;
use genai_llm::{cosine_similarity, Embedder, LlmClient};
use tracing::info;

use crate::provision::{model_client, vector_store, Cleanup, CliResult, Connection, EMBEDDING_MODEL, TESTING_CHAT_MODEL};

pub const QUESTION: &str = "How I can enable verbose logging in Testcontainers Desktop?";
pub const SEARCH_QUERY: &str = "cloud.logs.verbose";
pub const SCORE_THRESHOLD: f32 = 0.60;
pub const MAX_RESULTS: usize = 3;

/// What a correct answer must say, for the evaluator model
pub const EVALUATION_REFERENCE: &str = "
- Answer must indicate that you can enable verbose logging in Testcontainers Desktop by setting the property cloud.logs.verbose to true in the ~/.testcontainers.properties file
- Answer must indicate that you can enable verbose logging in Testcontainers Desktop by adding the --verbose flag when running the cli
";

/// A correct answer, compared by embedding similarity
pub const SIMILARITY_REFERENCE: &str = "To enable verbose logging in Testcontainers Desktop you can set the property cloud.logs.verbose to true in the ~/.testcontainers.properties file or add the --verbose flag when running the cli";
pub const SIMILARITY_THRESHOLD: f32 = 0.80;

pub async fn run(connection: &Connection, evaluate: bool) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let result = testing(connection, evaluate, &mut cleanup).await;
    cleanup.finish(result).await
}

async fn testing(connection: &Connection, evaluate: bool, cleanup: &mut Cleanup) -> CliResult<()> {
    info!("{}", QUESTION);
    let chat_client = model_client(connection, TESTING_CHAT_MODEL, cleanup).await?;
    let embedding_client = model_client(connection, EMBEDDING_MODEL, cleanup).await?;

    let straight = ChatService::new(chat_client.clone()).chat(QUESTION).await.wrap("straight chat")?;
    println!(">> Straight answer:\n {}", straight);

    let ragged = ragged_chat(chat_client.clone(), embedding_client.clone(), cleanup)
        .await?
        .chat(QUESTION)
        .await
        .wrap("ragged chat")?;
    println!(">> Ragged answer:\n {}", ragged);

    if !evaluate {
        return Ok(());
    }

    let mut failures = Vec::new();
    for (label, answer) in [("straight", &straight), ("ragged", &ragged)] {
        if !answer.contains(SEARCH_QUERY) {
            failures.push(format!("{} answer does not contain '{}'", label, SEARCH_QUERY));
        }

        let similarity = answer_similarity(embedding_client.as_ref(), answer).await?;
        println!(">> {} answer similarity: {:.2}", label, similarity);
        if similarity <= SIMILARITY_THRESHOLD {
            failures.push(format!("{} answer similarity is {:.2}", label, similarity));
        }

        let evaluation = EvaluatorAgent::new(chat_client.clone())
            .evaluation(QUESTION, answer, EVALUATION_REFERENCE)
            .await?;
        println!(">> {} answer evaluation: {} ({})", label, evaluation.response, evaluation.reason);
        if !evaluation.is_yes() {
            failures.push(format!("{} answer evaluated as {}: {}", label, evaluation.response, evaluation.reason));
        }
    }

    if failures.is_empty() {
        println!("{}", console::style("All checks passed").green());
        Ok(())
    } else {
        Err(failures.join("\n").into())
    }
}

/// Chat grounded on the knowledge chunks closest to the search query
async fn ragged_chat(
    chat_client: Arc<LlmClient>,
    embedding_client: Arc<LlmClient>,
    cleanup: &mut Cleanup,
) -> CliResult<ChatService> {
    let store = vector_store(embedding_client, cleanup).await?;
    ingest(store.as_ref(), &KNOWLEDGE, &TextSplitter::default()).await.wrap("ingestion")?;

    let relevant = store
        .similarity_search(SEARCH_QUERY, MAX_RESULTS, &SearchOptions::with_score_threshold(SCORE_THRESHOLD))
        .await
        .wrap("similarity search")?;
    info!(target: "genai::rag", "Relevant documents for RAG: {}", relevant.len());

    Ok(ChatService::new(chat_client).with_rag_context(relevant))
}

/// Cosine similarity between the answer and the reference answer
pub async fn answer_similarity(embedder: &dyn Embedder, answer: &str) -> CliResult<f32> {
    let vectors = embedder
        .embed_documents(&[SIMILARITY_REFERENCE.to_string(), answer.to_string()])
        .await
        .wrap("embed answer")?;
    match vectors.as_slice() {
        [reference, answer] => Ok(cosine_similarity(reference, answer)?),
        _ => Err(format!("expected 2 embeddings, got {}", vectors.len()).into()),
    }
}
