pub(crate) mod types;

use crate::http::JsonEndpoint;
use crate::traits::TextGenerator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::warn;

use types::*;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

// =============================================================================
// Claude Agent
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> Result<JsonEndpoint> {
        JsonEndpoint::new(
            "Claude",
            self.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL),
        )?
        .header("x-api-key", &self.api_key)?
        .header("anthropic-version", ANTHROPIC_VERSION)
    }

    /// Single user turn at temperature 0, first text block back.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = MessagesRequest::new(&self.model)
            .message(WireMessage::user(prompt))
            .max_tokens(MAX_TOKENS)
            .temperature(0.0);

        let response: MessagesResponse = self.endpoint()?.post("messages", &request).await?;

        if response.stop_reason.as_deref() == Some("max_tokens") {
            warn!(model = %self.model, "Claude response hit max_tokens, output may be truncated");
        }

        response
            .text()
            .ok_or_else(|| anyhow!("No response from Claude"))
    }
}

#[async_trait]
impl TextGenerator for Claude {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(prompt).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}
