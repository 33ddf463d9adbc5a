use crate::containers::container::{Container, ContainerRequest, Docker};
use crate::error::GenAiResult;

pub const WEAVIATE_PORT: u16 = 8080;

/// A weaviate database running in a container
#[derive(Debug, Clone)]
pub struct WeaviateContainer {
    pub container: Container,
}

impl WeaviateContainer {
    /// Anonymous access, no vectorizer module, readiness on the well-known endpoint
    pub fn request<S: Into<String>>(image: S) -> ContainerRequest {
        ContainerRequest::new(image, WEAVIATE_PORT)
            .with_env("AUTHENTICATION_ANONYMOUS_ACCESS_ENABLED", "true")
            .with_env("PERSISTENCE_DATA_PATH", "/var/lib/weaviate")
            .with_env("DEFAULT_VECTORIZER_MODULE", "none")
            .with_env("QUERY_DEFAULTS_LIMIT", "25")
            .with_env("CLUSTER_HOSTNAME", "node1")
            .with_wait_path("/v1/.well-known/ready")
    }

    pub async fn run(docker: &Docker, request: ContainerRequest) -> GenAiResult<Self> {
        let container = docker.start(&request).await?;
        Ok(Self { container })
    }

    /// Scheme and `host:port` of the REST endpoint
    pub fn http_host_address(&self) -> (String, String) {
        ("http".to_string(), self.container.endpoint())
    }

    pub fn url(&self) -> String {
        let (scheme, host) = self.http_host_address();
        format!("{}://{}", scheme, host)
    }

    pub async fn terminate(&self) -> GenAiResult<()> {
        self.container.terminate().await
    }
}
