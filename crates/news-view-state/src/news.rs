//! State behind the article, detail, search and saved screens.

use std::sync::Arc;

use auth_engine::{AuthUser, SessionContext};
use futures_util::stream::{self, StreamExt};
use news_model::validation::validate_comment;
use news_model::{
    Article, ArticleId, CategoryFilter, Comment, CommentId, NewArticle, NewComment, Resource,
};
use news_sync::{NewsRepository, ResourceStream};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::feed::{drive, ignore, Mode, OnError, Owner};
use crate::slot::{Slot, SlotState};

/// Observable state for the news screens.
///
/// Every operation is fire-and-forget: it moves its slot to `Loading` and
/// spawns the work on the runtime handle. Re-running an operation
/// supersedes the previous run of the same slot.
#[derive(Clone)]
pub struct NewsViewState {
    inner: Arc<NewsInner>,
}

struct NewsInner {
    repo: NewsRepository,
    session: SessionContext,
    runtime: Handle,
    articles: Slot<Vec<Article>>,
    selected_article: Slot<Article>,
    comments: Slot<Vec<Comment>>,
    comments_for: Mutex<Option<ArticleId>>,
    is_article_liked: Slot<bool>,
    /// Last settled liked value; survives re-checks in flight.
    liked: Mutex<bool>,
    search_results: Slot<Vec<Article>>,
    saved_articles: Slot<Vec<Article>>,
    article_submission: Slot<ArticleId>,
    comment_submission: Slot<CommentId>,
    like_toggle: Slot<bool>,
    save_toggle: Slot<bool>,
    selected_category: watch::Sender<CategoryFilter>,
    error_message: watch::Sender<Option<String>>,
}

impl Owner for NewsInner {
    fn runtime(&self) -> &Handle {
        &self.runtime
    }

    fn report(&self, message: String) {
        warn!(%message, "news operation failed");
        self.error_message.send_replace(Some(message));
    }
}

impl NewsViewState {
    pub fn new(repo: NewsRepository, session: SessionContext, runtime: Handle) -> Self {
        let (selected_category, _) = watch::channel(CategoryFilter::All);
        let (error_message, _) = watch::channel(None);
        Self {
            inner: Arc::new(NewsInner {
                repo,
                session,
                runtime,
                articles: Slot::new(),
                selected_article: Slot::new(),
                comments: Slot::new(),
                comments_for: Mutex::new(None),
                is_article_liked: Slot::new(),
                liked: Mutex::new(false),
                search_results: Slot::new(),
                saved_articles: Slot::new(),
                article_submission: Slot::new(),
                comment_submission: Slot::new(),
                like_toggle: Slot::new(),
                save_toggle: Slot::new(),
                selected_category,
                error_message,
            }),
        }
    }

    /// Subscribes to the article list and, when signed in, loads the saved list.
    pub fn start(&self) {
        self.inner.load_all_articles();
        if self.inner.session.is_signed_in() {
            self.inner.load_saved_articles();
        }
    }

    pub fn load_all_articles(&self) {
        self.inner.load_all_articles();
    }

    pub fn load_articles_by_category(&self, filter: CategoryFilter) {
        let inner = &self.inner;
        inner.selected_category.send_replace(filter.clone());
        inner.clear_error();
        drive(
            inner,
            |s| &s.articles,
            inner.repo.articles_by_category(&filter),
            Mode::OneShot,
            OnError::Surface,
            ignore,
        );
    }

    /// Blank queries clear the results without asking the backend.
    pub fn search(&self, query: &str) {
        let inner = &self.inner;
        if query.trim().is_empty() {
            inner.search_results.set(SlotState::Success(Vec::new()));
            return;
        }
        inner.clear_error();
        drive(
            inner,
            |s| &s.search_results,
            inner.repo.search_articles(query),
            Mode::OneShot,
            OnError::Surface,
            ignore,
        );
    }

    /// Follows one article. Every fresh snapshot re-checks the liked flag;
    /// comments are re-subscribed only when the article changes.
    pub fn load_article(&self, article_id: &ArticleId) {
        let inner = &self.inner;
        inner.clear_error();
        let changed = {
            let mut current = inner.comments_for.lock();
            if current.as_ref() == Some(article_id) {
                false
            } else {
                *current = Some(article_id.clone());
                true
            }
        };
        if changed {
            *inner.liked.lock() = false;
        }

        let liked_for = article_id.clone();
        drive(
            inner,
            |s| &s.selected_article,
            inner.repo.article(article_id),
            Mode::Subscription,
            OnError::Surface,
            move |owner: &Arc<NewsInner>, _| owner.check_if_liked(&liked_for),
        );

        if changed {
            drive(
                inner,
                |s| &s.comments,
                inner.repo.comments(article_id),
                Mode::Subscription,
                OnError::Collapse,
                ignore,
            );
        }
    }

    /// Posts `text` on the selected article as the signed-in user.
    pub fn add_comment(&self, text: &str) {
        let inner = &self.inner;
        let Some(article_id) = inner.comments_for.lock().clone() else {
            debug!("add_comment ignored: no article selected");
            return;
        };
        let Some(user) = inner.session.current_user() else {
            debug!("add_comment ignored: not signed in");
            return;
        };
        if let Err(e) = validate_comment(text) {
            let message = e.to_string();
            inner.comment_submission.set(SlotState::Error(message.clone()));
            inner.report(message);
            return;
        }

        let states = comment_states(inner.repo.clone(), user, article_id, text.to_string());
        drive(
            inner,
            |s| &s.comment_submission,
            states,
            Mode::OneShot,
            OnError::Surface,
            ignore,
        );
    }

    /// Flips the liked state shown for `article_id`.
    pub fn toggle_like(&self, article_id: &ArticleId) {
        let inner = &self.inner;
        let Some(user) = inner.session.current_user() else {
            debug!("toggle_like ignored: not signed in");
            return;
        };
        let like = !*inner.liked.lock();
        drive(
            inner,
            |s| &s.like_toggle,
            inner.repo.toggle_like(&user.user_id, article_id, like),
            Mode::OneShot,
            OnError::Surface,
            move |owner: &Arc<NewsInner>, _| {
                *owner.liked.lock() = like;
                owner.is_article_liked.set(SlotState::Success(like));
            },
        );
    }

    pub fn save_article(&self, article_id: &ArticleId) {
        let inner = &self.inner;
        let Some(user) = inner.session.current_user() else {
            debug!("save_article ignored: not signed in");
            return;
        };
        drive(
            inner,
            |s| &s.save_toggle,
            inner.repo.save_article(&user.user_id, article_id),
            Mode::OneShot,
            OnError::Surface,
            |owner: &Arc<NewsInner>, _| owner.load_saved_articles(),
        );
    }

    pub fn unsave_article(&self, article_id: &ArticleId) {
        let inner = &self.inner;
        let Some(user) = inner.session.current_user() else {
            debug!("unsave_article ignored: not signed in");
            return;
        };
        drive(
            inner,
            |s| &s.save_toggle,
            inner.repo.unsave_article(&user.user_id, article_id),
            Mode::OneShot,
            OnError::Surface,
            |owner: &Arc<NewsInner>, _| owner.load_saved_articles(),
        );
    }

    pub fn load_saved_articles(&self) {
        self.inner.load_saved_articles();
    }

    /// Publishes a new article, then reloads the list. A draft without an
    /// author is attributed to the signed-in user.
    pub fn add_article(&self, mut draft: NewArticle) {
        let inner = &self.inner;
        if draft.author_id.is_blank() {
            if let Some(user) = inner.session.current_user() {
                draft.author_name = user
                    .display_name
                    .clone()
                    .unwrap_or_else(|| user.email.clone());
                draft.author_id = user.user_id;
            }
        }
        inner.clear_error();
        drive(
            inner,
            |s| &s.article_submission,
            inner.repo.add_article(draft),
            Mode::OneShot,
            OnError::Surface,
            |owner: &Arc<NewsInner>, _| owner.load_all_articles(),
        );
    }

    pub fn reset_article_submission(&self) {
        self.inner.article_submission.set(SlotState::Idle);
    }

    pub fn clear_error(&self) {
        self.inner.clear_error();
    }

    pub fn articles(&self) -> watch::Receiver<SlotState<Vec<Article>>> {
        self.inner.articles.subscribe()
    }

    pub fn selected_article(&self) -> watch::Receiver<SlotState<Article>> {
        self.inner.selected_article.subscribe()
    }

    pub fn comments(&self) -> watch::Receiver<SlotState<Vec<Comment>>> {
        self.inner.comments.subscribe()
    }

    pub fn is_article_liked(&self) -> watch::Receiver<SlotState<bool>> {
        self.inner.is_article_liked.subscribe()
    }

    pub fn search_results(&self) -> watch::Receiver<SlotState<Vec<Article>>> {
        self.inner.search_results.subscribe()
    }

    pub fn saved_articles(&self) -> watch::Receiver<SlotState<Vec<Article>>> {
        self.inner.saved_articles.subscribe()
    }

    pub fn article_submission(&self) -> watch::Receiver<SlotState<ArticleId>> {
        self.inner.article_submission.subscribe()
    }

    pub fn comment_submission(&self) -> watch::Receiver<SlotState<CommentId>> {
        self.inner.comment_submission.subscribe()
    }

    pub fn like_toggle(&self) -> watch::Receiver<SlotState<bool>> {
        self.inner.like_toggle.subscribe()
    }

    pub fn save_toggle(&self) -> watch::Receiver<SlotState<bool>> {
        self.inner.save_toggle.subscribe()
    }

    pub fn selected_category(&self) -> watch::Receiver<CategoryFilter> {
        self.inner.selected_category.subscribe()
    }

    pub fn error_message(&self) -> watch::Receiver<Option<String>> {
        self.inner.error_message.subscribe()
    }
}

impl NewsInner {
    fn clear_error(&self) {
        self.error_message.send_replace(None);
    }

    fn load_all_articles(self: &Arc<Self>) {
        self.clear_error();
        drive(
            self,
            |s| &s.articles,
            self.repo.all_articles(),
            Mode::Subscription,
            OnError::Surface,
            ignore,
        );
    }

    fn load_saved_articles(self: &Arc<Self>) {
        let Some(user) = self.session.current_user() else {
            debug!("load_saved_articles ignored: not signed in");
            return;
        };
        self.clear_error();
        drive(
            self,
            |s| &s.saved_articles,
            self.repo.saved_articles(&user.user_id),
            Mode::OneShot,
            OnError::Surface,
            ignore,
        );
    }

    fn check_if_liked(self: &Arc<Self>, article_id: &ArticleId) {
        let Some(user) = self.session.current_user() else {
            return;
        };
        drive(
            self,
            |s| &s.is_article_liked,
            self.repo.is_article_liked(&user.user_id, article_id),
            Mode::OneShot,
            OnError::Collapse,
            |owner: &Arc<NewsInner>, liked| *owner.liked.lock() = liked,
        );
    }
}

/// Resolves the author name, then posts the comment.
fn comment_states(
    repo: NewsRepository,
    user: AuthUser,
    article_id: ArticleId,
    text: String,
) -> ResourceStream<CommentId> {
    let posting = async move {
        let user_display_name = repo.comment_author_name(&user).await;
        repo.add_comment(NewComment {
            article_id,
            user_id: user.user_id,
            user_display_name,
            text,
        })
    };
    ResourceStream::from_states(
        stream::once(posting)
            .flatten()
            .filter(|state| futures_util::future::ready(!matches!(state, Resource::Loading))),
    )
}
