use async_trait::async_trait;
use serde_json::Value;

use crate::error::{EchoError, Result};
use crate::interfaces::storage::MediaStorage;

/// Stand-in for deployments without a configured media service; image
/// captures are rejected, everything else works.
pub struct DisabledMediaStore;

#[async_trait]
impl MediaStorage for DisabledMediaStore {
    async fn upload(&self, _bytes: Vec<u8>, _filename: &str) -> Result<String> {
        Err(EchoError::Validation(
            "media storage is not configured".to_string(),
        ))
    }
}

/// Uploads captured images to a hosted media service (an unsigned
/// Cloudinary-style endpoint) and returns the durable URL.
pub struct HostedMediaStore {
    upload_url: String,
    upload_preset: Option<String>,
    client: reqwest::Client,
}

impl HostedMediaStore {
    pub fn new(upload_url: String, upload_preset: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(Self {
            upload_url,
            upload_preset,
            client,
        })
    }
}

#[async_trait]
impl MediaStorage for HostedMediaStore {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(preset) = &self.upload_preset {
            form = form.text("upload_preset", preset.clone());
        }

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| EchoError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EchoError::Http(format!("media upload failed: {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EchoError::Serialization(e.to_string()))?;
        body.get("secure_url")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .ok_or_else(|| EchoError::Runtime("media upload returned no url".to_string()))
    }
}
