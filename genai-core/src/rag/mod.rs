pub mod document;
pub mod knowledge;
pub mod memory;
pub mod splitter;
pub mod store;
pub mod weaviate;


pub use document::Document;
pub use knowledge::{ingest, load_documents, KNOWLEDGE};
pub use memory::MemoryStore;
pub use splitter::TextSplitter;
pub use store::{select_store, SearchOptions, VectorStore};
pub use weaviate::WeaviateStore;
