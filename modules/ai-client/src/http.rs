use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

/// Upper bound on one provider round trip, connect through body.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// One provider's JSON API: base URL plus the auth headers every call carries.
pub(crate) struct JsonEndpoint {
    provider: &'static str,
    http: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl JsonEndpoint {
    pub fn new(provider: &'static str, base_url: &str) -> Result<Self> {
        Self::with_timeout(provider, base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(provider: &'static str, base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(Self {
            provider,
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Result<Self> {
        self.headers
            .insert(HeaderName::from_static(name), HeaderValue::from_str(value)?);
        Ok(self)
    }

    /// POST `body` to `{base_url}/{path}`. Non-2xx responses become errors
    /// carrying the status and response text.
    pub async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(provider = self.provider, %url, "Provider request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("{} API error ({}): {}", self.provider, status, error_text));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn base_url_loses_trailing_slash() {
        let endpoint = JsonEndpoint::new("Test", "https://api.example.com/v1/").unwrap();
        assert_eq!(endpoint.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn invalid_header_value_is_an_error() {
        let result = JsonEndpoint::new("Test", "https://api.example.com")
            .unwrap()
            .header("x-api-key", "bad\nkey");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stalled_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let endpoint =
            JsonEndpoint::with_timeout("Test", &server.uri(), Duration::from_millis(100)).unwrap();
        let result: Result<serde_json::Value> = endpoint.post("generate", &serde_json::json!({})).await;

        assert!(result.is_err());
    }
}
