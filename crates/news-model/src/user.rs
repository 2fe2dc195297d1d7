use serde::{Deserialize, Serialize};

use crate::{ArticleId, UserId};

/// A profile document from the `users` collection, keyed by auth subject id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    /// Server-side authorization flag for publishing.
    pub admin: bool,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub saved_articles: Vec<ArticleId>,
}

impl User {
    /// Profile created the first time an account without a document signs in.
    ///
    /// A blank `display_name` falls back to the part of the email before `@`.
    pub fn bootstrap(id: UserId, email: &str, display_name: Option<&str>, created_at: i64) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email_local_part(email).to_string());
        Self {
            id,
            email: email.to_string(),
            display_name,
            admin: false,
            created_at,
            saved_articles: Vec::new(),
        }
    }
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Existence of this record under `users/{user}/likes/{article}` means the
/// user likes the article.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LikeMarker {
    pub article_id: ArticleId,
    /// Milliseconds since the Unix epoch.
    pub liked_at: i64,
}
