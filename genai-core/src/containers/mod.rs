pub mod container;
pub mod huggingface;
pub mod ollama;
pub mod runner;
pub mod weaviate;


pub use container::{parse_host_port, Container, ContainerRequest, Docker, PostStartHook};
pub use huggingface::HuggingFaceModel;
pub use ollama::OllamaContainer;
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use weaviate::WeaviateContainer;
