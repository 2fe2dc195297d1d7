//! Session and profile adapters.

use std::sync::Arc;

use auth_engine::{AuthError, AuthProvider, AuthUser, SessionContext};
use chrono::Utc;
use doc_store::{DocumentStore, StoreError};
use futures_util::stream::{self, StreamExt};
use news_model::schema::{self, fields};
use news_model::{Resource, User};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::{decode, encode, failure};
use crate::ResourceStream;

/// Signs users in and out and keeps their `users` profile documents.
#[derive(Clone)]
pub struct AuthRepository {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn DocumentStore>,
}

impl AuthRepository {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self { auth, store }
    }

    pub fn session(&self) -> SessionContext {
        SessionContext::new(self.auth.clone())
    }

    /// Signs in and returns the profile. An account with no profile
    /// document gets a fresh one written before success is reported; an
    /// existing document that does not decode is an error and is left as is.
    pub fn sign_in(&self, email: &str, password: &str) -> ResourceStream<User> {
        let auth = self.auth.clone();
        let store = self.store.clone();
        let email = email.trim().to_string();
        let password = password.to_string();
        ResourceStream::once(async move {
            let account = match auth.sign_in(&email, &password).await {
                Ok(account) => account,
                Err(e) => return sign_in_failure(e),
            };
            match load_or_bootstrap(store.as_ref(), &account).await {
                Ok(user) => {
                    info!(user_id = %user.id, "signed in");
                    Resource::Success(user)
                }
                Err(e) => failure(e, "An unknown error occurred"),
            }
        })
    }

    /// Creates the account and always writes its profile document.
    pub fn register(&self, email: &str, password: &str, display_name: &str) -> ResourceStream<User> {
        let auth = self.auth.clone();
        let store = self.store.clone();
        let email = email.trim().to_string();
        let password = password.to_string();
        let display_name = display_name.trim().to_string();
        ResourceStream::once(async move {
            let account = match auth.register(&email, &password, &display_name).await {
                Ok(account) => account,
                Err(e) => return registration_failure(e),
            };
            let user = User::bootstrap(
                account.user_id.clone(),
                &account.email,
                Some(display_name.as_str()),
                Utc::now().timestamp_millis(),
            );
            match write_profile(store.as_ref(), &user).await {
                Ok(()) => {
                    info!(user_id = %user.id, "registered");
                    Resource::Success(user)
                }
                Err(e) => failure(e, "An unknown error occurred during registration"),
            }
        })
    }

    pub fn sign_out(&self) -> ResourceStream<()> {
        let auth = self.auth.clone();
        ResourceStream::once(async move {
            match auth.sign_out().await {
                Ok(()) => Resource::Success(()),
                Err(e) => failure(auth_message(e), "An unknown error occurred"),
            }
        })
    }

    /// Profile of the signed-in user, re-emitted on every session change.
    ///
    /// `Success(None)` while signed out. A signed-in account without a
    /// profile document yields a default profile that is not written back.
    pub fn current_user(&self) -> ResourceStream<Option<User>> {
        let store = self.store.clone();
        let sessions = stream::unfold(
            (self.auth.watch_session(), true),
            |(mut receiver, first)| async move {
                if !first && receiver.changed().await.is_err() {
                    return None;
                }
                let session = receiver.borrow_and_update().clone();
                Some((session, (receiver, false)))
            },
        );
        ResourceStream::from_states(sessions.then(move |session| {
            let store = store.clone();
            async move {
                let Some(account) = session else {
                    return Resource::Success(None);
                };
                match store.get(schema::USERS, account.user_id.as_str()).await {
                    Ok(Some(document)) => match decode::<User>(&document) {
                        Ok(user) => Resource::Success(Some(user)),
                        Err(e) => failure(e, "Error fetching user data"),
                    },
                    Ok(None) => {
                        debug!(user_id = %account.user_id, "no profile document, using defaults");
                        Resource::Success(Some(default_profile(&account)))
                    }
                    Err(e) => failure(e, "Error fetching user data"),
                }
            }
        }))
    }

    /// Whether the signed-in user's profile carries `admin: true`.
    pub fn is_current_user_admin(&self) -> ResourceStream<bool> {
        let Some(account) = self.auth.current_user() else {
            return ResourceStream::ready(Resource::Success(false));
        };
        let store = self.store.clone();
        ResourceStream::once(async move {
            match store.get(schema::USERS, account.user_id.as_str()).await {
                Ok(Some(document)) => Resource::Success(
                    document
                        .get(fields::ADMIN)
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                ),
                Ok(None) => Resource::Success(false),
                Err(e) => failure(e, "Error checking admin status"),
            }
        })
    }
}

fn default_profile(account: &AuthUser) -> User {
    User::bootstrap(
        account.user_id.clone(),
        &account.email,
        account.display_name.as_deref(),
        Utc::now().timestamp_millis(),
    )
}

/// Failure while persisting a profile document.
#[derive(Debug, Error)]
enum ProfileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Encode(#[from] serde_json::Error),

    #[error("User document exists but couldn't be converted")]
    Malformed(#[source] serde_json::Error),
}

async fn load_or_bootstrap(
    store: &dyn DocumentStore,
    account: &AuthUser,
) -> Result<User, ProfileError> {
    if let Some(document) = store.get(schema::USERS, account.user_id.as_str()).await? {
        return decode::<User>(&document).map_err(|e| {
            warn!(user_id = %account.user_id, error = %e, "profile does not decode");
            ProfileError::Malformed(e)
        });
    }
    let user = default_profile(account);
    write_profile(store, &user).await?;
    Ok(user)
}

async fn write_profile(store: &dyn DocumentStore, user: &User) -> Result<(), ProfileError> {
    let record = encode(user)?;
    store
        .set(schema::USERS, user.id.as_str(), record.into())
        .await?;
    Ok(())
}

fn auth_message(error: AuthError) -> String {
    match error {
        AuthError::Backend(message) => message,
        other => other.to_string(),
    }
}

fn sign_in_failure<T>(error: AuthError) -> Resource<T> {
    debug!(error = %error, "sign-in rejected");
    match error {
        AuthError::UserNotFound(_) => Resource::error("User not found. Please check your email."),
        AuthError::InvalidCredentials | AuthError::InvalidEmail(_) => {
            Resource::error("Invalid password. Please try again.")
        }
        other => failure(auth_message(other), "An unknown error occurred"),
    }
}

fn registration_failure<T>(error: AuthError) -> Resource<T> {
    debug!(error = %error, "registration rejected");
    match error {
        AuthError::WeakPassword(_) => {
            Resource::error("Password is too weak. Please use at least 6 characters.")
        }
        AuthError::EmailAlreadyInUse(_) => {
            Resource::error("An account with this email already exists.")
        }
        AuthError::InvalidEmail(_) => {
            Resource::error("Invalid email format. Please check your email.")
        }
        other => failure(
            auth_message(other),
            "An unknown error occurred during registration",
        ),
    }
}
