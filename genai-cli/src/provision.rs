use std::sync::Arc;

use genai_core::containers::{Container, Docker, OllamaContainer, WeaviateContainer};
use genai_core::rag::{select_store, VectorStore};
use genai_core::{GenAiConfig, VectorStoreKind, WrapErr};
use genai_llm::{Embedder, LlmClient};
use tracing::{info, warn};

pub type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub const WEAVIATE_IMAGE: &str = "semitechnologies/weaviate:1.27.2";

/// Where the programs find their model server, from the global flags
#[derive(Debug, Clone, Default)]
pub struct Connection {
    /// ollama server to use instead of starting a container
    pub server_url: Option<String>,
    /// provider from `~/.genai.config` and the environment, no container either
    pub provider: Option<String>,
    /// overrides the model of the program
    pub model: Option<String>,
    /// leave started containers running
    pub keep_containers: bool,
}

/// Ollama image bundling a model, started when no server is given
#[derive(Debug, Clone, Copy)]
pub struct ModelImage {
    pub image: &'static str,
    pub model: &'static str,
    pub name: Option<&'static str>,
    pub reuse: bool,
    /// serves embeddings only, `--model` never replaces it
    pub embedding: bool,
}

pub const CHAT_MODEL: ModelImage = ModelImage {
    image: "mdelapenya/llama3.2:0.3.13-1b",
    model: "llama3.2:1b",
    name: None,
    reuse: false,
    embedding: false,
};

pub const SHARED_CHAT_MODEL: ModelImage = ModelImage {
    name: Some("chat-model"),
    reuse: true,
    ..CHAT_MODEL
};

pub const TESTING_CHAT_MODEL: ModelImage = ModelImage {
    image: "mdelapenya/llama3.2:0.3.13-3b",
    model: "llama3.2:3b",
    name: Some("chat-model"),
    reuse: true,
    embedding: false,
};

/// 3b is the smallest llama3.2 following the tool prompt
pub const TOOLS_CHAT_MODEL: ModelImage = ModelImage {
    image: "mdelapenya/llama3.2:0.5.4-3b",
    model: "llama3.2:3b",
    name: Some("chat-model"),
    reuse: true,
    embedding: false,
};

pub const VISION_MODEL: ModelImage = ModelImage {
    image: "mdelapenya/moondream:0.3.13-1.8b",
    model: "moondream:1.8b",
    name: None,
    reuse: false,
    embedding: false,
};

pub const EMBEDDING_MODEL: ModelImage = ModelImage {
    image: "mdelapenya/all-minilm:0.3.13-22m",
    model: "all-minilm:22m",
    name: Some("embeddings-model"),
    reuse: true,
    embedding: true,
};

/// Containers started during a run, removed once it is over unless kept
pub struct Cleanup {
    docker: Docker,
    containers: Vec<Container>,
    keep: bool,
}

impl Cleanup {
    pub fn new(keep: bool) -> Self {
        Self {
            docker: Docker::default(),
            containers: Vec::new(),
            keep,
        }
    }

    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    pub fn track(&mut self, container: &Container) {
        self.containers.push(container.clone());
    }

    pub fn containers(&self) -> Vec<Container> {
        self.containers.clone()
    }

    /// Remove the containers. A failed removal is reported unless the run already failed.
    pub async fn finish<T>(self, result: CliResult<T>) -> CliResult<T> {
        let failures = terminate_all(&self.containers, self.keep).await;
        match (result, failures.is_empty()) {
            (Ok(_), false) => Err(format!("terminate container: {}", failures.join(", ")).into()),
            (result, _) => result,
        }
    }
}

/// Remove every container, in reverse start order; returns the failures
pub async fn terminate_all(containers: &[Container], keep: bool) -> Vec<String> {
    if keep {
        for container in containers {
            info!(target: "genai::container", "keeping container {} at {}", container.id, container.endpoint());
        }
        return Vec::new();
    }

    let mut failures = Vec::new();
    for container in containers.iter().rev() {
        if let Err(e) = container.terminate().await {
            warn!(target: "genai::container", "terminate {}: {}", container.id, e);
            failures.push(e.to_string());
        }
    }
    failures
}

/// Client for the program's model: the configured provider, the given server, or a fresh container
pub async fn model_client(
    connection: &Connection,
    image: ModelImage,
    cleanup: &mut Cleanup,
) -> CliResult<Arc<LlmClient>> {
    let client = if let Some(provider) = &connection.provider {
        let mut config = GenAiConfig::load()?;
        config.provider = provider.clone();
        configured_client(&config, connection, image)?
    } else if let Some(url) = &connection.server_url {
        ollama_client(url.clone(), connection, image)
    } else {
        let url = run_ollama(image, cleanup).await?;
        ollama_client(url, connection, image)
    };

    info!(
        target: "genai::container",
        "using {} on {}",
        client.embedding_model().or(client.model()).unwrap_or("the provider default"),
        client.provider_name()
    );
    Ok(Arc::new(client))
}

/// Models come from the config; `--model` only replaces the chat model
fn configured_client(config: &GenAiConfig, connection: &Connection, image: ModelImage) -> CliResult<LlmClient> {
    let client = config.client()?;
    Ok(match &connection.model {
        Some(model) if !image.embedding => client.with_model(model.clone()),
        _ => client,
    })
}

/// Ollama serving the image's model; `--model` only replaces a chat model
fn ollama_client(url: String, connection: &Connection, image: ModelImage) -> LlmClient {
    let client = LlmClient::ollama(url);
    if image.embedding {
        return client.with_embedding_model(image.model);
    }
    let model = connection.model.clone().unwrap_or_else(|| image.model.to_string());
    client.with_model(model)
}

pub async fn run_ollama(image: ModelImage, cleanup: &mut Cleanup) -> CliResult<String> {
    let mut request = OllamaContainer::request(image.image).with_reuse(image.reuse);
    if let Some(name) = image.name {
        request = request.with_name(name);
    }
    let ollama = OllamaContainer::run(cleanup.docker(), request)
        .await
        .wrap(&format!("run {}", image.image))?;
    cleanup.track(&ollama.container);
    Ok(ollama.connection_string())
}

/// Store selected by VECTOR_STORE. Weaviate runs in a container unless WEAVIATE_URL is set.
pub async fn vector_store(embedder: Arc<dyn Embedder>, cleanup: &mut Cleanup) -> CliResult<Box<dyn VectorStore>> {
    let config = GenAiConfig::load()?;

    let url = match (config.vector_store, &config.weaviate_url) {
        (VectorStoreKind::Weaviate, None) => {
            let request = WeaviateContainer::request(WEAVIATE_IMAGE)
                .with_name("weaviate-db")
                .with_reuse(true);
            let weaviate = WeaviateContainer::run(cleanup.docker(), request)
                .await
                .wrap("run weaviate")?;
            cleanup.track(&weaviate.container);
            weaviate.url()
        }
        _ => config.weaviate_url().to_string(),
    };

    Ok(select_store(config.vector_store, embedder, &url).await?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn ollama_config(chat_model: Option<&str>) -> GenAiConfig {
        GenAiConfig {
            provider: "ollama".to_string(),
            env_vars: HashMap::from([("OLLAMA_BASE_URL".to_string(), "http://127.0.0.1:1".to_string())]),
            chat_model: chat_model.map(str::to_string),
            embedding_model: Some("nomic-embed-text".to_string()),
            ..GenAiConfig::default()
        }
    }

    #[test]
    fn test_configured_chat_model_is_kept() {
        let connection = Connection { provider: Some("ollama".to_string()), ..Default::default() };
        let client = configured_client(&ollama_config(Some("qwen3:8b")), &connection, CHAT_MODEL).unwrap();
        assert_eq!(client.model(), Some("qwen3:8b"));
        assert_eq!(client.embedding_model(), Some("nomic-embed-text"));

        let client = configured_client(&ollama_config(None), &connection, CHAT_MODEL).unwrap();
        assert_eq!(client.model(), None);
    }

    #[test]
    fn test_model_flag_replaces_configured_chat_model() {
        let connection = Connection {
            provider: Some("ollama".to_string()),
            model: Some("llama3.2:3b".to_string()),
            ..Default::default()
        };
        let chat = configured_client(&ollama_config(Some("qwen3:8b")), &connection, CHAT_MODEL).unwrap();
        assert_eq!(chat.model(), Some("llama3.2:3b"));

        let embeddings = configured_client(&ollama_config(Some("qwen3:8b")), &connection, EMBEDDING_MODEL).unwrap();
        assert_eq!(embeddings.model(), Some("qwen3:8b"));
        assert_eq!(embeddings.embedding_model(), Some("nomic-embed-text"));
    }

    #[test]
    fn test_model_flag_never_reaches_embedding_image() {
        let connection = Connection { model: Some("llama3.2:3b".to_string()), ..Default::default() };

        let embeddings = ollama_client("http://127.0.0.1:1".to_string(), &connection, EMBEDDING_MODEL);
        assert_eq!(embeddings.embedding_model(), Some("all-minilm:22m"));
        assert_eq!(embeddings.model(), None);

        let chat = ollama_client("http://127.0.0.1:1".to_string(), &connection, TESTING_CHAT_MODEL);
        assert_eq!(chat.model(), Some("llama3.2:3b"));

        let bundled = ollama_client("http://127.0.0.1:1".to_string(), &Connection::default(), VISION_MODEL);
        assert_eq!(bundled.model(), Some("moondream:1.8b"));
    }
}
