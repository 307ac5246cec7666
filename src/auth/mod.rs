use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domains::journal::SessionUser;
use crate::error::{EchoError, Result};
use crate::interfaces::auth::SessionAuth;

/// Client for the external session service. The service owns signup, session
/// exchange and the user records themselves; this core only resolves bearer
/// credentials and forwards account deletion.
pub struct AuthClient {
    base_url: String,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| EchoError::Runtime(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn parse_session(body: &Value) -> Option<SessionUser> {
        let user = body.get("user")?;
        let id = user.get("id")?.as_str()?.to_string();
        Some(SessionUser {
            id,
            email: user
                .get("email")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string()),
            name: user
                .get("name")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string()),
        })
    }
}

#[async_trait]
impl SessionAuth for AuthClient {
    async fn session(&self, bearer: &str) -> Result<Option<SessionUser>> {
        if bearer.trim().is_empty() {
            return Ok(None);
        }

        let url = format!("{}/get-session", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bearer {bearer}"))
            .send()
            .await
            .map_err(|e| EchoError::Http(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(EchoError::Http(format!("session lookup failed: {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EchoError::Serialization(e.to_string()))?;
        if body.is_null() {
            return Ok(None);
        }
        Ok(Self::parse_session(&body))
    }

    async fn delete_user(&self, bearer: &str) -> Result<()> {
        let url = format!("{}/delete-user", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("authorization", format!("Bearer {bearer}"))
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| EchoError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EchoError::Http(format!("account deletion failed: {status}")));
        }
        Ok(())
    }
}
