use async_trait::async_trait;

use crate::domains::journal::SessionUser;
use crate::error::Result;

/// The external authentication/session collaborator. Given the request's
/// bearer credential it yields the session user, or `None` when no valid
/// session exists.
#[async_trait]
pub trait SessionAuth: Send + Sync {
    async fn session(&self, bearer: &str) -> Result<Option<SessionUser>>;

    /// Deletes the account behind the credential; ownership cascades are the
    /// collaborator's concern.
    async fn delete_user(&self, bearer: &str) -> Result<()>;
}
