//! Domain records for the news application.
//!
//! Everything here is plain data: the records persisted in the document
//! store, their string id newtypes, the `Resource` envelope handed to
//! observers, collection names, and input validation rules.

mod article;
mod comment;
mod ids;
mod resource;
pub mod schema;
mod user;
pub mod validation;

pub use article::{Article, Category, CategoryFilter, NewArticle};
pub use comment::{Comment, NewComment};
pub use ids::{ArticleId, CommentId, UserId};
pub use resource::Resource;
pub use user::{LikeMarker, User};
pub use validation::ValidationError;
