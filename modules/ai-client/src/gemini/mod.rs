pub(crate) mod types;

use crate::http::JsonEndpoint;
use crate::traits::TextGenerator;
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use types::*;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

// =============================================================================
// Gemini Agent
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
}

impl Gemini {
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
        JsonEndpoint::new("Gemini", self.base_url.as_deref().unwrap_or(GEMINI_API_URL))?
            .header("x-goog-api-key", &self.api_key)
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest::user_prompt(prompt).temperature(0.0);

        let path = format!("v1beta/models/{}:generateContent", self.model);
        let response: GenerateResponse = self.endpoint()?.post(&path, &request).await?;

        if let Some(reason) = response.block_reason() {
            return Err(anyhow!("Gemini blocked the prompt: {reason}"));
        }

        response
            .text()
            .ok_or_else(|| anyhow!("No response from Gemini"))
    }
}

#[async_trait]
impl TextGenerator for Gemini {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(prompt).await
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "gemini-2.5-flash";

    #[test]
    fn test_gemini_new() {
        let ai = Gemini::new("AIza-test", MODEL);
        assert_eq!(ai.model(), MODEL);
        assert_eq!(ai.api_key, "AIza-test");
        assert!(ai.base_url.is_none());
    }

    #[tokio::test]
    async fn generate_joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "AIza-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "```json\n{"}, {"text": "}\n```"}]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let ai = Gemini::new("AIza-test", MODEL).with_base_url(server.uri());
        let text = ai.generate("extract").await.unwrap();
        assert_eq!(text, "```json\n{}\n```");
    }

    #[tokio::test]
    async fn blocked_prompt_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": {"blockReason": "SAFETY"}
            })))
            .mount(&server)
            .await;

        let ai = Gemini::new("AIza-test", MODEL).with_base_url(server.uri());
        let err = ai.generate("extract").await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn http_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let ai = Gemini::new("bad", MODEL).with_base_url(server.uri());
        let err = ai.generate("extract").await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }
}
