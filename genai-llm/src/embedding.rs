use async_trait::async_trait;

use crate::client::LlmClient;
use crate::provider::LlmError;

/// Turns text into vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| "no embedding returned for query".into())
    }
}

#[async_trait]
impl Embedder for LlmClient {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = match self.embedding_model() {
            Some(model) => model.to_string(),
            None => self.default_model().await?,
        };
        self.provider().embed(&model, texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_query_uses_embedding_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(json!({"model": "all-minilm:22m", "input": ["What is my favorite sport?"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[0.5, 0.5, 0.0]]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::ollama(server.uri())
            .with_model("llama3.2:1b")
            .with_embedding_model("all-minilm:22m");
        let vector = client.embed_query("What is my favorite sport?").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5, 0.0]);
    }

    #[tokio::test]
    async fn test_embedding_model_ignores_genai_model() {
        std::env::set_var("GENAI_MODEL", "qwen3:8b");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(json!({"model": "all-minilm:22m"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"embeddings": [[1.0, 0.0], [0.0, 1.0]]})))
            .expect(1)
            .mount(&server)
            .await;

        let client = LlmClient::ollama(server.uri()).with_embedding_model("all-minilm:22m");
        let texts = vec!["I like football".to_string(), "The weather is good today.".to_string()];
        let vectors = client.embed_documents(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
    }

    #[tokio::test]
    async fn test_embed_nothing_skips_the_server() {
        let client = LlmClient::ollama("http://127.0.0.1:1".to_string()).with_embedding_model("all-minilm:22m");
        assert!(client.embed_documents(&[]).await.unwrap().is_empty());
    }
}
