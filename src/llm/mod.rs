//! Generative text model abstraction.

mod gemini;
#[cfg(test)]
mod fake;

pub use gemini::{GeminiClient, DEMO_KEY};
#[cfg(test)]
pub use fake::FakeGenerator;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Model returned no text")]
    Empty,
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Generator not configured: {0}")]
    NotConfigured(String),
}

/// A single prompt/completion round trip. No retries.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// First `max_chars` characters of `text` for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...[{} chars total]", text.chars().count())
    } else {
        head
    }
}
