pub mod ai;
pub mod config;
pub mod containers;
pub mod error;
pub mod logging;
pub mod rag;
pub mod tools;

pub use config::{GenAiConfig, VectorStoreKind};
pub use error::{GenAiError, GenAiResult, WrapErr};
pub use logging::LoggingConfig;
