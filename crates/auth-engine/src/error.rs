//! Authentication error types.

use thiserror::Error;

/// Failure reported by an [`crate::AuthProvider`].
///
/// Callers turn these into user-facing text per operation; the display
/// strings here are for logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No account for this email
    #[error("No account found for {0}")]
    UserNotFound(String),

    /// Wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Malformed email address
    #[error("Malformed email address: {0}")]
    InvalidEmail(String),

    /// Password below the provider's minimum length
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    /// Account already registered
    #[error("An account already exists for {0}")]
    EmailAlreadyInUse(String),

    /// Service failure
    #[error("Auth service error: {0}")]
    Backend(String),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
