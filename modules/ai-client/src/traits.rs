use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// TextGenerator Trait
// =============================================================================

/// Single-shot prompt completion. One request, one text response, no streaming.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Provider/model label for logs.
    fn name(&self) -> &str;
}
