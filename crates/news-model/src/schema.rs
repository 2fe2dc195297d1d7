//! Collection names and field paths of the remote schema.

use crate::UserId;

pub const USERS: &str = "users";
pub const ARTICLES: &str = "articles";
pub const COMMENTS: &str = "comments";
const LIKES: &str = "likes";

pub mod fields {
    pub const ID: &str = "id";
    pub const PUBLISHED: &str = "published";
    pub const PUBLISHED_AT: &str = "publishedAt";
    pub const CATEGORY: &str = "category";
    pub const LIKE_COUNT: &str = "likeCount";
    pub const COMMENT_COUNT: &str = "commentCount";
    pub const ARTICLE_ID: &str = "articleId";
    pub const CREATED_AT: &str = "createdAt";
    pub const SAVED_ARTICLES: &str = "savedArticles";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const ADMIN: &str = "admin";
}

/// Path of a user's like-marker subcollection: `users/{user}/likes`.
pub fn likes_collection(user_id: &UserId) -> String {
    format!("{USERS}/{user_id}/{LIKES}")
}
