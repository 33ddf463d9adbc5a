use crate::containers::container::{Container, ContainerRequest, Docker};
use crate::error::GenAiResult;

pub const OLLAMA_PORT: u16 = 11434;

/// An ollama server running in a container
#[derive(Debug, Clone)]
pub struct OllamaContainer {
    pub container: Container,
}

impl OllamaContainer {
    /// Request for `image` with the ollama port published and readiness on `/`
    pub fn request<S: Into<String>>(image: S) -> ContainerRequest {
        ContainerRequest::new(image, OLLAMA_PORT).with_wait_path("/")
    }

    pub async fn run(docker: &Docker, request: ContainerRequest) -> GenAiResult<Self> {
        let container = docker.start(&request).await?;
        Ok(Self { container })
    }

    /// Base url to hand to the ollama client
    pub fn connection_string(&self) -> String {
        format!("http://{}", self.container.endpoint())
    }

    pub async fn commit(&self, image: &str) -> GenAiResult<()> {
        self.container.commit(image).await
    }

    pub async fn terminate(&self) -> GenAiResult<()> {
        self.container.terminate().await
    }
}
