pub mod client;
pub mod providers;
pub mod provider;
pub mod chat;
pub mod completion;
pub mod embedding;
pub mod message;
pub mod similarity;
pub mod tool;

// Re-export our client
pub use client::LlmClient;

pub use chat::{JsonHooks, NoHooks, RequestLogger};
pub use completion::{ChatChunk, Choice, Completion, CompletionAssembler, GenerationInfo};
pub use embedding::Embedder;
pub use message::{ChatRequest, ContentPart, GenerateOptions, Message, Role};
pub use provider::{LlmError, LlmProvider, LlmStream, ProviderInfo};
pub use similarity::{cosine_similarity, SimilarityError};

pub use tool::{
    ToolDescription,
    ToolBox,
    ContainsTool,
    ToolCall,
    ToolHandler,
    ToolLoop,
    ToolLoopError,
    Dispatch,
};
