pub mod api;
pub mod ollama;

pub use ollama::{OllamaProvider, OLLAMA_BASE_URL};
