use std::io::Write;
use std::sync::Arc;

use genai_llm::{GenerateOptions, LlmClient, Message};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::error::{GenAiResult, WrapErr};

/// Inputs that end a chat session
pub const SENTINELS: [&str; 3] = ["quit", "exit", "bye"];

/// Interactive conversation: every answer is streamed to the output and the whole
/// history is sent with each question.
pub struct ChatSession {
    client: Arc<LlmClient>,
    options: GenerateOptions,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(client: Arc<LlmClient>) -> Self {
        Self {
            client,
            options: GenerateOptions::default(),
            history: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Runs until a sentinel, end of input, or a model error
    pub async fn run<R, W>(&mut self, mut input: R, output: &mut W) -> GenAiResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write + Send,
    {
        loop {
            write!(output, "\nYou: ").wrap("write prompt")?;
            output.flush().wrap("write prompt")?;

            let mut line = String::new();
            if input.read_line(&mut line).await.wrap("read input")? == 0 {
                debug!(target: "genai::chat", "end of input");
                return Ok(());
            }
            let line = line.trim();
            if SENTINELS.contains(&line) {
                writeln!(output, "Ending chat session").wrap("write output")?;
                return Ok(());
            }

            self.history.push(Message::human(line));
            let completion = self
                .client
                .generate_streaming(self.history.clone(), &self.options, |chunk| {
                    write!(output, "{}", chunk.content)?;
                    output.flush()?;
                    Ok(())
                })
                .await
                .wrap("llm generate content")?;
            writeln!(output).wrap("write output")?;

            debug!(target: "genai::chat", turns = self.history.len(), "answer complete");
            self.history.push(Message::ai(completion.content()));
        }
    }
}
