use std::sync::Arc;

use async_trait::async_trait;
use genai_llm::Embedder;

use crate::config::VectorStoreKind;
use crate::error::GenAiResult;
use crate::rag::document::Document;
use crate::rag::memory::MemoryStore;
use crate::rag::weaviate::WeaviateStore;

/// Filters applied to a similarity search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Drop results scoring below this value
    pub score_threshold: Option<f32>,
}

impl SearchOptions {
    pub fn with_score_threshold(threshold: f32) -> Self {
        Self { score_threshold: Some(threshold) }
    }
}

/// Stores documents alongside their embeddings and finds the closest ones to a query
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and store the documents, returning their ids in input order
    async fn add_documents(&self, documents: &[Document]) -> GenAiResult<Vec<String>>;

    /// At most `k` documents, best match first, each with its `score` set
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        options: &SearchOptions,
    ) -> GenAiResult<Vec<Document>>;
}

/// Build the store selected by configuration
pub async fn select_store(
    kind: VectorStoreKind,
    embedder: Arc<dyn Embedder>,
    weaviate_url: &str,
) -> GenAiResult<Box<dyn VectorStore>> {
    match kind {
        VectorStoreKind::Memory => Ok(Box::new(MemoryStore::new(embedder))),
        VectorStoreKind::Weaviate => {
            let store = WeaviateStore::new(weaviate_url, embedder);
            store.ensure_class().await?;
            Ok(Box::new(store))
        }
    }
}
