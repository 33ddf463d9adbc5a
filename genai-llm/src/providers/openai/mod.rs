pub mod api;
pub mod openai;

pub use openai::{OpenAiProvider, OPENAI_BASE_URL};
