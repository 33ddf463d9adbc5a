use std::io::Write;
use std::sync::Arc;

use genai_core::containers::{ContainerRequest, HuggingFaceModel, OllamaContainer};
use genai_core::WrapErr;
use genai_llm::{GenerateOptions, LlmClient, Message};
use tracing::info;

use crate::provision::{Cleanup, CliResult, Connection};

pub const MODEL: &str = "DavidAU/DistiLabelOrca-TinyLLama-1.1B-Q8_0-GGUF";
pub const MODEL_FILE: &str = "distilabelorca-tinyllama-1.1b.Q8_0.gguf";
/// Image committed once the model is installed, so later runs skip the download
pub const IMAGE: &str = "distilabelorca-tinyllama-guff";
pub const BASE_IMAGE: &str = "ollama/ollama:0.5.4";

fn request(image: &str) -> ContainerRequest {
    OllamaContainer::request(image)
        .with_name("huggingface-model")
        .with_platform("linux/amd64")
        .with_reuse(true)
}

pub async fn run(connection: &Connection) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let result = huggingface(connection, &mut cleanup).await;
    cleanup.finish(result).await
}

async fn huggingface(connection: &Connection, cleanup: &mut Cleanup) -> CliResult<()> {
    let url = match &connection.server_url {
        Some(url) => url.clone(),
        None => start_model(cleanup).await?,
    };

    let model = connection.model.clone().unwrap_or_else(|| MODEL_FILE.to_string());
    let client = LlmClient::ollama(url).with_model(model);

    let messages = vec![
        Message::system("You are a fellow Rust developer."),
        Message::human("Provide 3 short bullet points explaining why Rust is awesome"),
    ];
    let mut stdout = std::io::stdout();
    let completion = client
        .generate_streaming(messages, &GenerateOptions::default(), |chunk| {
            write!(stdout, "{}", chunk.content)?;
            stdout.flush()?;
            Ok(())
        })
        .await
        .wrap("llm generate content")?;
    println!();
    if let Some(reason) = completion.choices.first().and_then(|c| c.stop_reason.as_ref()) {
        info!("stop reason: {}", reason);
    }
    Ok(())
}

/// Run the committed image, or build it from the base image and commit it
async fn start_model(cleanup: &mut Cleanup) -> CliResult<String> {
    let docker = cleanup.docker().clone();

    if docker.image_exists(IMAGE).await? {
        let ollama = OllamaContainer::run(&docker, request(IMAGE)).await.wrap(&format!("run {}", IMAGE))?;
        cleanup.track(&ollama.container);
        Ok(ollama.connection_string())
    } else {
        info!(target: "genai::container", "{} not found, installing {} into {}", IMAGE, MODEL, BASE_IMAGE);
        let hook = Arc::new(HuggingFaceModel::new(MODEL, MODEL_FILE));
        let ollama = OllamaContainer::run(&docker, request(BASE_IMAGE).with_hook(hook))
            .await
            .wrap(&format!("run {}", BASE_IMAGE))?;
        cleanup.track(&ollama.container);
        ollama.commit(IMAGE).await.wrap("commit")?;
        Ok(ollama.connection_string())
    }
}
