use async_trait::async_trait;

use crate::error::AiError;

/// Text-generation seam. The pipeline sends a system prompt plus a user
/// prompt and receives the raw response text; parsing is the caller's job.
#[async_trait]
pub trait GenerateAgent: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError>;
}

/// Embedding seam. Returns a fixed-dimension vector for the given text.
#[async_trait]
pub trait EmbedAgent: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;
}
