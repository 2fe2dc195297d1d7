//! Article, comment, like and bookmark adapters.

use std::sync::Arc;

use auth_engine::AuthUser;
use chrono::Utc;
use doc_store::{DocumentStore, DocumentWrite, Fields, Query, StoreResult};
use news_model::schema::{self, fields};
use news_model::validation::{validate_article, validate_comment};
use news_model::{
    Article, ArticleId, CategoryFilter, Comment, CommentId, LikeMarker, NewArticle, NewComment,
    Resource, User, UserId,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::{decode, decode_all, encode, failure};
use crate::ResourceStream;

const UNKNOWN_ERROR: &str = "Unknown error occurred";
const ANONYMOUS: &str = "Anonymous";

/// Tuning for [`NewsRepository`].
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Ids per `in` query when fetching documents by id list.
    pub in_query_limit: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            in_query_limit: doc_store::DEFAULT_MAX_IN_VALUES,
        }
    }
}

/// Reads and writes the news collections.
#[derive(Clone)]
pub struct NewsRepository {
    store: Arc<dyn DocumentStore>,
    config: RepositoryConfig,
}

impl NewsRepository {
    pub fn new(store: Arc<dyn DocumentStore>, config: RepositoryConfig) -> Self {
        Self {
            store,
            config: RepositoryConfig {
                in_query_limit: config.in_query_limit.max(1),
            },
        }
    }

    fn published_articles() -> Query {
        Query::collection(schema::ARTICLES).where_eq(fields::PUBLISHED, true)
    }

    /// Live list of published articles, newest first.
    pub fn all_articles(&self) -> ResourceStream<Vec<Article>> {
        let query = Self::published_articles().order_by_desc(fields::PUBLISHED_AT);
        debug!("subscribing to published articles");
        match self.store.listen_query(query) {
            Ok(listener) => ResourceStream::live(listener, |event| match event {
                Ok(snapshot) => Resource::Success(decode_all(&snapshot.documents)),
                Err(e) => failure(e, UNKNOWN_ERROR),
            }),
            Err(e) => ResourceStream::ready(failure(e, UNKNOWN_ERROR)),
        }
    }

    /// Live view of one article.
    pub fn article(&self, article_id: &ArticleId) -> ResourceStream<Article> {
        debug!(%article_id, "subscribing to article");
        match self
            .store
            .listen_document(schema::ARTICLES, article_id.as_str())
        {
            Ok(listener) => ResourceStream::live(listener, |event| match event {
                Ok(snapshot) => match snapshot.into_document() {
                    None => Resource::error("Article not found"),
                    Some(document) => match decode::<Article>(&document) {
                        Ok(article) => Resource::Success(article),
                        Err(e) => {
                            warn!(id = %document.id, error = %e, "article does not decode");
                            Resource::error("Failed to parse article data")
                        }
                    },
                },
                Err(e) => failure(e, UNKNOWN_ERROR),
            }),
            Err(e) => ResourceStream::ready(failure(e, UNKNOWN_ERROR)),
        }
    }

    /// Published articles whose title, content or summary contains `text`,
    /// ignoring case. Filters client-side over every published article.
    pub fn search_articles(&self, text: &str) -> ResourceStream<Vec<Article>> {
        let store = self.store.clone();
        let needle = text.to_lowercase();
        ResourceStream::once(async move {
            debug!(needle = %needle, "searching articles");
            match store.query(&Self::published_articles()).await {
                Ok(documents) => Resource::Success(
                    decode_all::<Article>(&documents)
                        .into_iter()
                        .filter(|article| article.matches_search(&needle))
                        .collect(),
                ),
                Err(e) => failure(e, "Unknown error occurred during search"),
            }
        })
    }

    /// Published articles of one category (or all), newest first.
    pub fn articles_by_category(&self, filter: &CategoryFilter) -> ResourceStream<Vec<Article>> {
        let mut query = Self::published_articles();
        if let CategoryFilter::Only(category) = filter {
            query = query.where_eq(fields::CATEGORY, category.as_str());
        }
        let query = query.order_by_desc(fields::PUBLISHED_AT);
        let store = self.store.clone();
        let filter = filter.clone();
        ResourceStream::once(async move {
            debug!(category = %filter, "fetching articles by category");
            match store.query(&query).await {
                Ok(documents) => Resource::Success(decode_all(&documents)),
                Err(e) => failure(e, UNKNOWN_ERROR),
            }
        })
    }

    /// Adds the article to the user's saved list. Saving twice keeps one entry.
    pub fn save_article(&self, user_id: &UserId, article_id: &ArticleId) -> ResourceStream<bool> {
        let store = self.store.clone();
        let user_id = user_id.clone();
        let article_id = article_id.clone();
        ResourceStream::once(async move {
            let result = store
                .array_union(
                    schema::USERS,
                    user_id.as_str(),
                    fields::SAVED_ARTICLES,
                    Value::String(article_id.to_string()),
                )
                .await;
            match result {
                Ok(()) => {
                    info!(%user_id, %article_id, "article saved");
                    Resource::Success(true)
                }
                Err(e) => failure(e, "Failed to save article"),
            }
        })
    }

    pub fn unsave_article(&self, user_id: &UserId, article_id: &ArticleId) -> ResourceStream<bool> {
        let store = self.store.clone();
        let user_id = user_id.clone();
        let article_id = article_id.clone();
        ResourceStream::once(async move {
            let result = store
                .array_remove(
                    schema::USERS,
                    user_id.as_str(),
                    fields::SAVED_ARTICLES,
                    Value::String(article_id.to_string()),
                )
                .await;
            match result {
                Ok(()) => {
                    info!(%user_id, %article_id, "article unsaved");
                    Resource::Success(true)
                }
                Err(e) => failure(e, "Failed to unsave article"),
            }
        })
    }

    /// The user's saved articles that are still published.
    ///
    /// Ids are fetched in chunks of `in_query_limit`, one query per chunk.
    /// Results are concatenated chunk by chunk with no overall ordering.
    pub fn saved_articles(&self, user_id: &UserId) -> ResourceStream<Vec<Article>> {
        let store = self.store.clone();
        let user_id = user_id.clone();
        let chunk_size = self.config.in_query_limit;
        ResourceStream::once(async move {
            match fetch_saved(store.as_ref(), &user_id, chunk_size).await {
                Ok(articles) => Resource::Success(articles),
                Err(e) => failure(e, "Failed to get saved articles"),
            }
        })
    }

    /// Creates an article. The store assigns `publishedAt`; counts start at 0.
    pub fn add_article(&self, draft: NewArticle) -> ResourceStream<ArticleId> {
        if let Err(e) = validate_article(&draft) {
            return ResourceStream::failed(e);
        }
        let store = self.store.clone();
        ResourceStream::once(async move {
            let article_id = draft
                .id
                .filter(|id| !id.is_blank())
                .unwrap_or_else(ArticleId::generate);
            let article = Article {
                id: article_id.clone(),
                title: draft.title,
                summary: draft.summary,
                content: draft.content,
                image_url: draft.image_url,
                author_id: draft.author_id,
                author_name: draft.author_name,
                category: draft.category,
                published: draft.published,
                ..Article::default()
            };
            let fields = match encode(&article) {
                Ok(fields) => fields,
                Err(e) => return failure(e, "Failed to add article"),
            };
            let write = DocumentWrite::new(fields).with_server_timestamp(fields::PUBLISHED_AT);
            match store
                .set(schema::ARTICLES, article_id.as_str(), write)
                .await
            {
                Ok(()) => {
                    info!(%article_id, "article added");
                    Resource::Success(article_id)
                }
                Err(e) => failure(e, "Failed to add article"),
            }
        })
    }

    /// Live comments of an article, newest first.
    pub fn comments(&self, article_id: &ArticleId) -> ResourceStream<Vec<Comment>> {
        let query = Query::collection(schema::COMMENTS)
            .where_eq(fields::ARTICLE_ID, article_id.as_str())
            .order_by_desc(fields::CREATED_AT);
        debug!(%article_id, "subscribing to comments");
        match self.store.listen_query(query) {
            Ok(listener) => ResourceStream::live(listener, |event| match event {
                Ok(snapshot) => Resource::Success(decode_all(&snapshot.documents)),
                Err(e) => failure(e, UNKNOWN_ERROR),
            }),
            Err(e) => ResourceStream::ready(failure(e, UNKNOWN_ERROR)),
        }
    }

    /// Posts a comment, then bumps the article's `commentCount`.
    ///
    /// Blank text is rejected before any backend call. The two writes are
    /// independent: if the increment fails the comment stays written.
    pub fn add_comment(&self, draft: NewComment) -> ResourceStream<CommentId> {
        let text = match validate_comment(&draft.text) {
            Ok(text) => text,
            Err(e) => return ResourceStream::failed(e),
        };
        let store = self.store.clone();
        ResourceStream::once(async move {
            let comment = Comment {
                id: CommentId::generate(),
                article_id: draft.article_id,
                user_id: draft.user_id,
                user_display_name: draft.user_display_name,
                text,
                created_at: Utc::now().timestamp_millis(),
            };
            let fields = match encode(&comment) {
                Ok(fields) => fields,
                Err(e) => return failure(e, "Failed to add comment"),
            };
            match write_comment(store.as_ref(), &comment, fields).await {
                Ok(()) => {
                    info!(comment_id = %comment.id, article_id = %comment.article_id, "comment added");
                    Resource::Success(comment.id)
                }
                Err(e) => failure(e, "Failed to add comment"),
            }
        })
    }

    /// Likes (`like == true`) or unlikes an article for a user. Success is
    /// `true` either way.
    ///
    /// The marker write and the `likeCount` change are separate calls with
    /// no compensation: a failure between them leaves them out of step.
    pub fn toggle_like(
        &self,
        user_id: &UserId,
        article_id: &ArticleId,
        like: bool,
    ) -> ResourceStream<bool> {
        let store = self.store.clone();
        let user_id = user_id.clone();
        let article_id = article_id.clone();
        ResourceStream::once(async move {
            let marker = if like {
                let marker = LikeMarker {
                    article_id: article_id.clone(),
                    liked_at: Utc::now().timestamp_millis(),
                };
                match encode(&marker) {
                    Ok(fields) => Some(fields),
                    Err(e) => return failure(e, "Failed to toggle like"),
                }
            } else {
                None
            };
            match write_like(store.as_ref(), &user_id, &article_id, marker).await {
                Ok(()) => {
                    info!(%user_id, %article_id, like, "like toggled");
                    Resource::Success(true)
                }
                Err(e) => failure(e, "Failed to toggle like"),
            }
        })
    }

    pub fn is_article_liked(&self, user_id: &UserId, article_id: &ArticleId) -> ResourceStream<bool> {
        let store = self.store.clone();
        let collection = schema::likes_collection(user_id);
        let article_id = article_id.clone();
        ResourceStream::once(async move {
            match store.get(&collection, article_id.as_str()).await {
                Ok(marker) => Resource::Success(marker.is_some()),
                Err(e) => failure(e, "Failed to check if article is liked"),
            }
        })
    }

    /// Name shown on a new comment: the account's display name, else the
    /// profile's `displayName`, else "Anonymous".
    pub async fn comment_author_name(&self, user: &AuthUser) -> String {
        if let Some(name) = user.display_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        match self.store.get(schema::USERS, user.user_id.as_str()).await {
            Ok(Some(document)) => document
                .get(fields::DISPLAY_NAME)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| ANONYMOUS.to_string()),
            Ok(None) => ANONYMOUS.to_string(),
            Err(e) => {
                warn!(user_id = %user.user_id, error = %e, "profile lookup failed");
                ANONYMOUS.to_string()
            }
        }
    }
}

async fn fetch_saved(
    store: &dyn DocumentStore,
    user_id: &UserId,
    chunk_size: usize,
) -> StoreResult<Vec<Article>> {
    let saved_ids = match store.get(schema::USERS, user_id.as_str()).await? {
        Some(document) => decode::<User>(&document)
            .map(|user| user.saved_articles)
            .unwrap_or_else(|e| {
                warn!(%user_id, error = %e, "profile does not decode");
                Vec::new()
            }),
        None => Vec::new(),
    };
    if saved_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut articles = Vec::with_capacity(saved_ids.len());
    for chunk in saved_ids.chunks(chunk_size) {
        let query = Query::collection(schema::ARTICLES)
            .where_in(fields::ID, chunk.iter().map(|id| id.as_str()))
            .where_eq(fields::PUBLISHED, true);
        let documents = store.query(&query).await?;
        articles.extend(decode_all::<Article>(&documents));
    }
    debug!(%user_id, saved = saved_ids.len(), found = articles.len(), "saved articles fetched");
    Ok(articles)
}

async fn write_comment(
    store: &dyn DocumentStore,
    comment: &Comment,
    record: Fields,
) -> StoreResult<()> {
    store
        .set(schema::COMMENTS, comment.id.as_str(), record.into())
        .await?;
    store
        .increment(
            schema::ARTICLES,
            comment.article_id.as_str(),
            fields::COMMENT_COUNT,
            1,
        )
        .await
}

/// `marker` present likes the article, absent unlikes it.
async fn write_like(
    store: &dyn DocumentStore,
    user_id: &UserId,
    article_id: &ArticleId,
    marker: Option<Fields>,
) -> StoreResult<()> {
    let likes = schema::likes_collection(user_id);
    let delta = match marker {
        Some(marker) => {
            store.set(&likes, article_id.as_str(), marker.into()).await?;
            1
        }
        None => {
            store.delete(&likes, article_id.as_str()).await?;
            -1
        }
    };
    store
        .increment(schema::ARTICLES, article_id.as_str(), fields::LIKE_COUNT, delta)
        .await
}
