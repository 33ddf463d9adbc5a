use genai_llm::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenAiError {
    /// An underlying failure annotated with the step that produced it
    #[error("{op}: {source}")]
    Wrapped {
        op: String,
        #[source]
        source: LlmError,
    },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Container error: {0}")]
    Container(String),
    #[error("Vector store error: {0}")]
    Store(String),
    #[error("Ingestion error: {0}")]
    Ingestion(String),
    #[error("Tool error: {0}")]
    Tool(String),
}

pub type GenAiResult<T> = Result<T, GenAiError>;

/// Attach the name of the failing step to any error, e.g. `.wrap("embed documents")?`
pub trait WrapErr<T> {
    fn wrap(self, op: &str) -> GenAiResult<T>;
}

impl<T, E> WrapErr<T> for Result<T, E>
where
    E: Into<LlmError>,
{
    fn wrap(self, op: &str) -> GenAiResult<T> {
        self.map_err(|e| GenAiError::Wrapped {
            op: op.to_string(),
            source: e.into(),
        })
    }
}
