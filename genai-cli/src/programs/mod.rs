pub mod augmented;
pub mod chat;
pub mod embeddings;
pub mod functions;
pub mod hello_world;
pub mod huggingface;
pub mod rag;
pub mod streaming;
pub mod testing;
pub mod vision;
