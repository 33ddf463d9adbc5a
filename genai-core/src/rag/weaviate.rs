use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use genai_llm::chat::JsonClient;
use genai_llm::Embedder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{GenAiError, GenAiResult, WrapErr};
use crate::rag::document::Document;
use crate::rag::store::{SearchOptions, VectorStore};

pub const DEFAULT_CLASS: &str = "Testcontainers";

/// Weaviate over its REST and GraphQL apis. Vectors are computed by the embedder,
/// the class is created with `vectorizer: none`.
pub struct WeaviateStore {
    client: JsonClient,
    class: String,
    embedder: Arc<dyn Embedder>,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    classes: Vec<ClassInfo>,
}

#[derive(Debug, Deserialize)]
struct ClassInfo {
    class: String,
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    objects: Vec<BatchObject>,
}

#[derive(Debug, Serialize)]
struct BatchObject {
    class: String,
    id: String,
    properties: ObjectProperties,
    vector: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectProperties {
    text: String,
    /// document metadata as a JSON string
    metadata: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: Option<String>,
    #[serde(rename = "_additional")]
    additional: Option<Additional>,
}

#[derive(Debug, Deserialize)]
struct Additional {
    certainty: Option<f32>,
}

impl WeaviateStore {
    pub fn new(base_url: &str, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            client: JsonClient::new(base_url),
            class: DEFAULT_CLASS.to_string(),
            embedder,
        }
    }

    pub fn with_class<S: Into<String>>(mut self, class: S) -> Self {
        self.class = class.into();
        self
    }

    /// Create the class unless it already exists
    pub async fn ensure_class(&self) -> GenAiResult<()> {
        let schema: SchemaResponse = self.client.get_json("/v1/schema").await.wrap("read weaviate schema")?;
        if schema.classes.iter().any(|c| c.class == self.class) {
            debug!(target: "genai::rag", "weaviate class {} already exists", self.class);
            return Ok(());
        }

        let class = json!({
            "class": self.class,
            "vectorizer": "none",
            "properties": [
                {"name": "text", "dataType": ["text"]},
                {"name": "metadata", "dataType": ["text"]},
            ],
        });
        let _: Value = self.client.post_json("/v1/schema", &class).await.wrap("create weaviate class")?;
        info!(target: "genai::rag", "created weaviate class {}", self.class);
        Ok(())
    }

    fn search_query(&self, vector: &[f32], k: usize, options: &SearchOptions) -> String {
        let vector = vector.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        let certainty = options
            .score_threshold
            .map(|threshold| format!(", certainty: {}", threshold))
            .unwrap_or_default();
        format!(
            "{{ Get {{ {class}(nearVector: {{vector: [{vector}]{certainty}}}, limit: {k}) {{ text metadata _additional {{ certainty }} }} }} }}",
            class = self.class,
        )
    }
}

fn batch_errors(results: &[Value]) -> Vec<String> {
    results
        .iter()
        .filter_map(|object| object.pointer("/result/errors/error"))
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(|error| error.get("message").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl VectorStore for WeaviateStore {
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

        let mut ids = Vec::with_capacity(documents.len());
        let mut objects = Vec::with_capacity(documents.len());
        for (document, vector) in documents.iter().zip(vectors) {
            let id = uuid::Uuid::new_v4().to_string();
            let metadata = serde_json::to_string(&document.metadata).wrap("encode metadata")?;
            objects.push(BatchObject {
                class: self.class.clone(),
                id: id.clone(),
                properties: ObjectProperties { text: document.page_content.clone(), metadata },
                vector,
            });
            ids.push(id);
        }

        let results: Vec<Value> = self
            .client
            .post_json("/v1/batch/objects", &BatchRequest { objects })
            .await
            .wrap("weaviate batch import")?;
        let errors = batch_errors(&results);
        if !errors.is_empty() {
            return Err(GenAiError::Store(errors.join("; ")));
        }

        info!(target: "genai::rag", "stored {} documents in weaviate class {}", ids.len(), self.class);
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        options: &SearchOptions,
    ) -> GenAiResult<Vec<Document>> {
        let vector = self.embedder.embed_query(query).await.wrap("embed query")?;
        let body = json!({ "query": self.search_query(&vector, k, options) });

        let response: GraphQlResponse = self.client.post_json("/v1/graphql", &body).await.wrap("weaviate search")?;
        if !response.errors.is_empty() {
            let messages: Vec<_> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(GenAiError::Store(messages.join("; ")));
        }

        let hits = response
            .data
            .as_ref()
            .and_then(|data| data.pointer(&format!("/Get/{}", self.class)))
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));
        let hits: Vec<Hit> = serde_json::from_value(hits).wrap("decode weaviate hits")?;

        hits.into_iter()
            .map(|hit| {
                let metadata: HashMap<String, Value> = match hit.metadata.as_deref() {
                    Some(raw) if !raw.is_empty() => serde_json::from_str(raw).wrap("decode metadata")?,
                    _ => HashMap::new(),
                };
                Ok(Document {
                    page_content: hit.text,
                    metadata,
                    score: hit.additional.and_then(|a| a.certainty),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_with_certainty() {
        struct NoEmbedder;
        #[async_trait]
        impl Embedder for NoEmbedder {
            async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, genai_llm::LlmError> {
                Ok(Vec::new())
            }
        }

        let store = WeaviateStore::new("http://localhost:8080", Arc::new(NoEmbedder));
        let query = store.search_query(&[0.5, 1.0], 3, &SearchOptions::with_score_threshold(0.6));
        assert_eq!(
            query,
            "{ Get { Testcontainers(nearVector: {vector: [0.5,1], certainty: 0.6}, limit: 3) { text metadata _additional { certainty } } } }"
        );

        let query = store.search_query(&[0.5], 1, &SearchOptions::default());
        assert!(query.contains("nearVector: {vector: [0.5]}, limit: 1"));
    }

    #[test]
    fn test_batch_errors() {
        let results = vec![
            json!({"id": "1", "result": {}}),
            json!({"id": "2", "result": {"errors": {"error": [{"message": "vector lengths don't match"}]}}}),
        ];
        assert_eq!(batch_errors(&results), vec!["vector lengths don't match"]);
    }
}
