pub mod ollama;
pub mod openai;

#[cfg(test)]
mod tests;
