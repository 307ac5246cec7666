use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// A generative-language backend. Implementations must surface a transient
/// capacity condition as `EchoError::Overloaded` so callers can retry, and
/// must bound each call by `timeout`.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str, timeout: Duration) -> Result<String>;
}
