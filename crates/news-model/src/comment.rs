use serde::{Deserialize, Serialize};

use crate::{ArticleId, CommentId, UserId};

/// A comment document from the `comments` collection. Comments are never
/// edited or deleted once written.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    pub id: CommentId,
    pub article_id: ArticleId,
    pub user_id: UserId,
    /// Author name captured at write time.
    pub user_display_name: String,
    pub text: String,
    /// Client clock, milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Input for posting a comment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub article_id: ArticleId,
    pub user_id: UserId,
    pub user_display_name: String,
    pub text: String,
}
