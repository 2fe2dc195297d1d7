//! In-process auth provider.

use std::collections::HashMap;

use async_trait::async_trait;
use news_model::validation::{is_valid_email, MIN_PASSWORD_LEN};
use news_model::UserId;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{AuthError, AuthProvider, AuthResult, AuthUser};

struct Account {
    user: AuthUser,
    salt: String,
    password_hash: String,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Email/password accounts held in memory, with one process-wide session.
///
/// Follows the hosted service's rules: emails are matched case-insensitively,
/// passwords need at least six characters, and registering signs the new
/// account in.
pub struct MemoryAuthProvider {
    accounts: Mutex<HashMap<String, Account>>,
    session: watch::Sender<Option<AuthUser>>,
    failure: Mutex<Option<String>>,
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            session,
            failure: Mutex::new(None),
        }
    }

    /// Registers an account without signing it in.
    pub fn add_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> AuthResult<AuthUser> {
        Self::check_new_account(email, password)?;
        let key = email.trim().to_lowercase();

        let mut accounts = self.accounts.lock();
        if accounts.contains_key(&key) {
            return Err(AuthError::EmailAlreadyInUse(email.to_string()));
        }

        let display_name = display_name.trim();
        let user = AuthUser {
            user_id: UserId::from_string(Uuid::new_v4().simple().to_string()),
            email: email.trim().to_string(),
            display_name: (!display_name.is_empty()).then(|| display_name.to_string()),
        };
        let salt = Uuid::new_v4().to_string();
        accounts.insert(
            key,
            Account {
                user: user.clone(),
                password_hash: hash_password(&salt, password),
                salt,
            },
        );
        debug!(user_id = %user.user_id, "account created");
        Ok(user)
    }

    /// Makes the next provider call fail with a service error.
    pub fn fail_next(&self, message: &str) {
        *self.failure.lock() = Some(message.to_string());
    }

    fn take_failure(&self) -> AuthResult<()> {
        match self.failure.lock().take() {
            Some(message) => {
                warn!(%message, "injected auth failure");
                Err(AuthError::Backend(message))
            }
            None => Ok(()),
        }
    }

    fn check_new_account(email: &str, password: &str) -> AuthResult<()> {
        if !is_valid_email(email.trim()) {
            return Err(AuthError::InvalidEmail(email.to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(MIN_PASSWORD_LEN));
        }
        Ok(())
    }

    fn start_session(&self, user: &AuthUser) {
        self.session.send_replace(Some(user.clone()));
        info!(user_id = %user.user_id, "session started");
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthUser> {
        self.take_failure()?;
        if !is_valid_email(email.trim()) {
            return Err(AuthError::InvalidEmail(email.to_string()));
        }

        let user = {
            let accounts = self.accounts.lock();
            let account = accounts
                .get(&email.trim().to_lowercase())
                .ok_or_else(|| AuthError::UserNotFound(email.to_string()))?;
            if hash_password(&account.salt, password) != account.password_hash {
                return Err(AuthError::InvalidCredentials);
            }
            account.user.clone()
        };

        self.start_session(&user);
        Ok(user)
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> AuthResult<AuthUser> {
        self.take_failure()?;
        let user = self.add_account(email, password, display_name)?;
        self.start_session(&user);
        Ok(user)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.take_failure()?;
        if let Some(user) = self.session.send_replace(None) {
            info!(user_id = %user.user_id, "session ended");
        }
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.session.borrow().clone()
    }

    fn watch_session(&self) -> watch::Receiver<Option<AuthUser>> {
        self.session.subscribe()
    }
}
