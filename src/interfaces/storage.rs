use async_trait::async_trait;

use crate::error::Result;

/// Hosted object storage: takes a binary blob, returns a durable URL.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> Result<String>;
}
