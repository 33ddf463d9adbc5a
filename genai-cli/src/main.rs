mod programs;
mod provision;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use genai_core::LoggingConfig;
use tracing::error;

use crate::programs::vision::ImageSource;
use crate::provision::{CliResult, Connection};

#[derive(Parser)]
#[command(name = "genai")]
#[command(about = "Generative AI examples: chat, streaming, vision, embeddings, RAG and function calling")]
#[command(version)]
struct Args {
    /// Ollama server to use instead of starting a model container
    #[arg(long, global = true)]
    server_url: Option<String>,

    /// Provider from ~/.genai.config and the environment (ollama, openai, openai_compatible)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model to use instead of the one bundled with the example
    #[arg(long, global = true)]
    model: Option<String>,

    /// Leave the containers running once the example is over
    #[arg(long, global = true)]
    keep_containers: bool,

    /// Debug logging, HTTP traffic included
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for three reasons Rust is awesome
    HelloWorld,
    /// Stream a long answer, logging every request
    Streaming,
    /// Talk with a model until quit, exit or bye
    Chat,
    /// Describe an image
    Vision {
        /// Image file sent inline
        #[arg(long, conflicts_with = "image_url", required_unless_present = "image_url")]
        image: Option<PathBuf>,
        /// Image url
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Answer with and without extra context
    Augmented,
    /// Compare the embeddings of four sentences
    Embeddings,
    /// Retrieve the most relevant document and answer with it
    Rag,
    /// Straight versus retrieval augmented answer on the bundled knowledge
    Testing {
        /// Check both answers with the evaluator model and embedding similarity
        #[arg(long)]
        evaluate: bool,
    },
    /// Serve a GGUF model from Hugging Face through ollama
    Huggingface,
    /// Let the model call PokeAPI to answer
    Functions {
        /// Question for the model
        #[arg(long)]
        question: Option<String>,
        /// PokeAPI base url
        #[arg(long)]
        pokeapi_url: Option<String>,
    },
}

impl Args {
    fn connection(&self) -> Connection {
        Connection {
            server_url: self.server_url.clone(),
            provider: self.provider.clone(),
            model: self.model.clone(),
            keep_containers: self.keep_containers,
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut logging = LoggingConfig::from_env();
    if args.verbose {
        logging = logging.level("debug");
    }
    if let Err(e) = logging.init() {
        eprintln!("logging: {}", e);
    }

    if let Err(e) = run(args).await {
        error!("run: {}", e);
        eprintln!("run: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> CliResult<()> {
    let connection = args.connection();

    match args.command {
        Commands::HelloWorld => programs::hello_world::run(&connection).await,
        Commands::Streaming => programs::streaming::run(&connection).await,
        Commands::Chat => programs::chat::run(&connection).await,
        Commands::Vision { image, image_url } => {
            let source = match (image, image_url) {
                (Some(path), _) => ImageSource::File(path),
                (None, Some(url)) => ImageSource::Url(url),
                (None, None) => return Err("either --image or --image-url is required".into()),
            };
            programs::vision::run(&connection, source).await
        }
        Commands::Augmented => programs::augmented::run(&connection).await,
        Commands::Embeddings => programs::embeddings::run(&connection).await,
        Commands::Rag => programs::rag::run(&connection).await,
        Commands::Testing { evaluate } => programs::testing::run(&connection, evaluate).await,
        Commands::Huggingface => programs::huggingface::run(&connection).await,
        Commands::Functions { question, pokeapi_url } => {
            programs::functions::run(&connection, question, pokeapi_url).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "genai",
            "chat",
            "--server-url",
            "http://localhost:11434",
            "--model",
            "llama3.2:3b",
            "--verbose",
        ])
        .unwrap();

        assert!(matches!(args.command, Commands::Chat));
        assert!(args.verbose);
        let connection = args.connection();
        assert_eq!(connection.server_url.as_deref(), Some("http://localhost:11434"));
        assert_eq!(connection.model.as_deref(), Some("llama3.2:3b"));
        assert!(!connection.keep_containers);
    }

    #[test]
    fn test_vision_needs_an_image() {
        assert!(Args::try_parse_from(["genai", "vision"]).is_err());
        assert!(Args::try_parse_from(["genai", "vision", "--image", "cat.jpg", "--image-url", "http://x/cat.jpg"]).is_err());

        let args = Args::try_parse_from(["genai", "vision", "--image", "cat.jpg"]).unwrap();
        assert!(matches!(args.command, Commands::Vision { image: Some(_), image_url: None }));
    }

    #[test]
    fn test_testing_evaluate_flag() {
        let args = Args::try_parse_from(["genai", "testing", "--evaluate"]).unwrap();
        assert!(matches!(args.command, Commands::Testing { evaluate: true }));
    }
}
