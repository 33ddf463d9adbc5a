use async_trait::async_trait;
use tracing::{info, warn};

use crate::containers::container::{Container, PostStartHook};
use crate::error::{GenAiError, GenAiResult};

/// Installs the Hugging Face cli in an ollama container, downloads a GGUF file and
/// registers it as an ollama model named after the file.
#[derive(Debug, Clone)]
pub struct HuggingFaceModel {
    /// repository on Hugging Face, case sensitive
    pub model: String,
    /// file inside the repository, also the ollama model name
    pub model_file: String,
}

impl HuggingFaceModel {
    pub fn new<M: Into<String>, F: Into<String>>(model: M, model_file: F) -> Self {
        Self { model: model.into(), model_file: model_file.into() }
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        let owned = |args: &[&str]| args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
        vec![
            owned(&["apt-get", "update"]),
            owned(&["apt-get", "upgrade", "-y"]),
            owned(&["apt-get", "install", "-y", "python3-pip"]),
            owned(&["pip", "install", "huggingface-hub"]),
            owned(&["huggingface-cli", "download", self.model.as_str(), self.model_file.as_str(), "--local-dir", "."]),
            owned(&["sh", "-c", format!("echo 'FROM {}' > Modelfile", self.model_file).as_str()]),
            owned(&["ollama", "create", self.model_file.as_str(), "-f", "Modelfile"]),
            owned(&["rm", self.model_file.as_str()]),
        ]
    }
}

#[async_trait]
impl PostStartHook for HuggingFaceModel {
    /// Every command runs even after a failure, all failures are reported together
    async fn post_start(&self, container: &Container) -> GenAiResult<()> {
        let mut errors = Vec::new();
        for command in self.commands() {
            info!(target: "genai::container", "exec {:?}", command);
            match container.exec(&command).await {
                Ok((0, _)) => {}
                Ok((code, output)) => {
                    warn!(target: "genai::container", "exec {:?} returned {}: {}", command, code, output.trim());
                    errors.push(format!("exec {:?} returned {}", command, code));
                }
                Err(e) => errors.push(e.to_string()),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GenAiError::Container(errors.join("\n")))
        }
    }
}
