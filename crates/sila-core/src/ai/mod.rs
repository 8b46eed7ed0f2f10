pub mod gemini;

pub use gemini::GeminiClient;

use crate::error::GenerationError;
use async_trait::async_trait;

/// A remote text-generation service.
///
/// Each call is stateless from the service's point of view: only the prompt
/// is transmitted, never the transcript.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
