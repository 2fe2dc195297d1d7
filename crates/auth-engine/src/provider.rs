use async_trait::async_trait;
use news_model::UserId;
use tokio::sync::watch;

use crate::AuthResult;

/// Identity of the signed-in account as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: String,
    /// Profile display name, when the account has one.
    pub display_name: Option<String>,
}

/// The managed authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthUser>;

    /// Creates the account and signs it in. A blank `display_name` leaves
    /// the profile name unset.
    async fn register(&self, email: &str, password: &str, display_name: &str)
        -> AuthResult<AuthUser>;

    async fn sign_out(&self) -> AuthResult<()>;

    fn current_user(&self) -> Option<AuthUser>;

    /// Session changes; the receiver starts at the current session.
    fn watch_session(&self) -> watch::Receiver<Option<AuthUser>>;
}
