use std::time::Duration;

use serde_json::Value;

use crate::error::{EchoError, Result};

/// Thin HTTP client for talking to a running `echod`, used by the CLI.
pub struct DaemonClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl DaemonClient {
    pub fn new(base_url: String, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let request = self
            .client
            .get(self.url(path))
            .query(query)
            .header("authorization", self.bearer());
        Self::read_json(request.send().await).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<Value> {
        let request = self
            .client
            .post(self.url(path))
            .header("authorization", self.bearer());
        Self::read_json(request.send().await).await
    }

    pub async fn post_multipart(&self, path: &str, form: reqwest::multipart::Form) -> Result<Value> {
        let request = self
            .client
            .post(self.url(path))
            .header("authorization", self.bearer())
            .multipart(form);
        Self::read_json(request.send().await).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        let request = self
            .client
            .delete(self.url(path))
            .header("authorization", self.bearer());
        Self::read_json(request.send().await).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    async fn read_json(
        response: std::result::Result<reqwest::Response, reqwest::Error>,
    ) -> Result<Value> {
        let response = response.map_err(|e| EchoError::Http(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EchoError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(EchoError::Http(format!("{status}: {body}")));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| EchoError::Serialization(e.to_string()))
    }
}
