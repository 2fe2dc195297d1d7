//! Input rules applied before anything reaches the backend.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::NewArticle;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_COMMENT_LEN: usize = 500;

/// Rejected input. The display text is shown to the user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Please enter a display name")]
    MissingDisplayName,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Comment cannot be empty")]
    EmptyComment,

    #[error("Comment cannot exceed 500 characters")]
    CommentTooLong,

    #[error("Article {0} is required")]
    MissingArticleField(&'static str),
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,6}$")
            .expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    !email.trim().is_empty() && email_regex().is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// Trims comment text and checks it is non-empty and within the length cap.
pub fn validate_comment(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyComment);
    }
    if trimmed.chars().count() > MAX_COMMENT_LEN {
        return Err(ValidationError::CommentTooLong);
    }
    Ok(trimmed.to_string())
}

/// Title, summary and content must not be blank.
pub fn validate_article(draft: &NewArticle) -> Result<(), ValidationError> {
    for (name, value) in [
        ("title", &draft.title),
        ("summary", &draft.summary),
        ("content", &draft.content),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingArticleField(name));
        }
    }
    Ok(())
}

/// Checks the sign-in form.
pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if !is_valid_password(password) {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Checks the registration form.
pub fn validate_registration(
    display_name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if display_name.trim().is_empty() {
        return Err(ValidationError::MissingDisplayName);
    }
    if !is_valid_password(password) {
        return Err(ValidationError::PasswordTooShort);
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}
