use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use genai_llm::{cosine_similarity, Embedder};
use tracing::debug;

use crate::error::{GenAiError, GenAiResult, WrapErr};
use crate::rag::document::Document;
use crate::rag::store::{SearchOptions, VectorStore};

struct Entry {
    id: String,
    document: Document,
    vector: Vec<f32>,
}

/// Keeps everything in process, scores with cosine similarity
pub struct MemoryStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<Entry>>,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> GenAiError {
    GenAiError::Store("memory store lock poisoned".to_string())
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn add_documents(&self, documents: &[Document]) -> GenAiResult<Vec<String>> {
        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let vectors = self.embedder.embed_documents(&texts).await.wrap("embed documents")?;
        if vectors.len() != documents.len() {
            return Err(GenAiError::Store(format!(
                "got {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let mut entries = self.entries.write().map_err(poisoned)?;
        let ids = documents
            .iter()
            .zip(vectors)
            .map(|(document, vector)| {
                let id = uuid::Uuid::new_v4().to_string();
                entries.push(Entry {
                    id: id.clone(),
                    document: Document { score: None, ..document.clone() },
                    vector,
                });
                id
            })
            .collect();
        debug!(target: "genai::rag", "memory store now holds {} documents", entries.len());
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        options: &SearchOptions,
    ) -> GenAiResult<Vec<Document>> {
        let query_vector = self.embedder.embed_query(query).await.wrap("embed query")?;

        let entries = self.entries.read().map_err(poisoned)?;
        let mut scored = Vec::with_capacity(entries.len());
        for entry in entries.iter() {
            let score = cosine_similarity(&query_vector, &entry.vector).wrap("score document")?;
            if options.score_threshold.map_or(true, |threshold| score >= threshold) {
                scored.push(entry.document.clone().with_score(score));
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
