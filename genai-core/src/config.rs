use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use genai_llm::LlmClient;
use serde::{Deserialize, Serialize};

use crate::error::{GenAiError, GenAiResult};

pub const DEFAULT_WEAVIATE_URL: &str = "http://localhost:8080";

/// Which vector store backs retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreKind {
    Weaviate,
    Memory,
}

impl VectorStoreKind {
    /// Unset or empty means weaviate, anything but weaviate/memory is rejected
    pub fn parse(value: Option<&str>) -> GenAiResult<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("weaviate") => Ok(Self::Weaviate),
            Some("memory") => Ok(Self::Memory),
            Some(other) => Err(GenAiError::Configuration(format!(
                "unsupported vector store {:?}, expected \"weaviate\" or \"memory\"",
                other
            ))),
        }
    }
}

/// Settings persisted in `~/.genai.config`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenAiConfig {
    pub provider: String,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    #[serde(default)]
    pub chat_model: Option<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default = "default_store")]
    pub vector_store: VectorStoreKind,
    #[serde(default)]
    pub weaviate_url: Option<String>,
}

fn default_store() -> VectorStoreKind {
    VectorStoreKind::Weaviate
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            env_vars: HashMap::new(),
            chat_model: None,
            embedding_model: None,
            vector_store: VectorStoreKind::Weaviate,
            weaviate_url: None,
        }
    }
}

impl GenAiConfig {
    pub fn config_path() -> GenAiResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| GenAiError::Configuration("Could not find home directory".to_string()))?;
        Ok(home.join(".genai.config"))
    }

    pub fn exists() -> bool {
        Self::config_path()
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    pub fn load_from(path: &Path) -> GenAiResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| GenAiError::Configuration(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| GenAiError::Configuration(format!("parse {}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> GenAiResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| GenAiError::Configuration(e.to_string()))?;
        fs::write(path, content)
            .map_err(|e| GenAiError::Configuration(format!("write {}: {}", path.display(), e)))
    }

    /// `~/.genai.config` when present, defaults otherwise; environment overrides applied
    pub fn load() -> GenAiResult<Self> {
        let config = if Self::exists() {
            Self::load_from(&Self::config_path()?)?
        } else {
            Self::default()
        };
        config.with_env_overrides(|name| std::env::var(name).ok())
    }

    pub fn save(&self) -> GenAiResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Apply VECTOR_STORE and WEAVIATE_URL, looked up through `lookup`
    pub fn with_env_overrides<F>(mut self, lookup: F) -> GenAiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(store) = lookup("VECTOR_STORE") {
            self.vector_store = VectorStoreKind::parse(Some(&store))?;
        }
        if let Some(url) = lookup("WEAVIATE_URL") {
            self.weaviate_url = Some(url);
        }
        Ok(self)
    }

    pub fn weaviate_url(&self) -> &str {
        self.weaviate_url.as_deref().unwrap_or(DEFAULT_WEAVIATE_URL)
    }

    /// Build the configured client. Env values stored in the config win over the process env.
    pub fn client(&self) -> GenAiResult<LlmClient> {
        let mut env_values: HashMap<String, String> = LlmClient::list_providers()
            .into_iter()
            .filter(|info| info.name == self.provider)
            .flat_map(|info| info.env_vars)
            .filter_map(|var| std::env::var(&var.name).ok().map(|value| (var.name, value)))
            .collect();
        env_values.extend(self.env_vars.clone());

        let mut client = LlmClient::create_provider(&self.provider, &env_values)
            .map_err(|e| GenAiError::Configuration(e.to_string()))?;
        if let Some(model) = &self.chat_model {
            client = client.with_model(model.clone());
        }
        if let Some(model) = &self.embedding_model {
            client = client.with_embedding_model(model.clone());
        }
        Ok(client)
    }
}
