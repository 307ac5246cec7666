use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{EchoError, Result};
use crate::interfaces::providers::GenerativeProvider;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the generative-language REST API. One instance is constructed
/// at startup and injected into the services that need it.
#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self> {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(Self {
            api_key,
            base_url,
            client,
        })
    }

    fn extract_text(body: &Value) -> Option<String> {
        let text = body
            .get("candidates")?
            .as_array()?
            .first()?
            .get("content")?
            .get("parts")?
            .as_array()?
            .first()?
            .get("text")?
            .as_str()?
            .trim()
            .to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn generate(&self, model: &str, prompt: &str, timeout: Duration) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let payload = json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EchoError::Http(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(EchoError::Overloaded(format!("{model}: {status}")));
        }
        if !status.is_success() {
            return Err(EchoError::Http(format!("{model}: {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EchoError::Serialization(e.to_string()))?;
        Self::extract_text(&body)
            .ok_or_else(|| EchoError::Runtime(format!("{model}: empty response")))
    }
}
