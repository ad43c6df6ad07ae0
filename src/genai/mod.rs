//! Generative-AI collaborator: one "generate text from prompt" call per named model.

mod gemini;

pub use gemini::{GeminiClient, GenerationConfig};

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Single attempt against `model`; no retries.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}
