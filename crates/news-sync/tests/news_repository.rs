//! Integration tests for the news adapters against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use doc_store::{DocumentStore, Fields, MemoryStore, StoreOp};
use news_model::{
    Article, ArticleId, Category, CategoryFilter, NewArticle, NewComment, Resource, UserId,
};
use news_sync::{NewsRepository, RepositoryConfig};
use serde_json::{json, Value};

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

fn setup() -> (MemoryStore, NewsRepository) {
    let store = MemoryStore::new();
    let repo = NewsRepository::new(Arc::new(store.clone()), RepositoryConfig::default());
    (store, repo)
}

fn seed_article(store: &MemoryStore, id: &str, category: &str, published_at: i64, published: bool) {
    store.seed(
        "articles",
        id,
        fields(json!({
            "title": format!("Title {id}"),
            "summary": format!("Summary {id}"),
            "content": format!("Content {id}"),
            "category": category,
            "published": published,
            "publishedAt": published_at,
            "likeCount": 0,
            "commentCount": 0,
        })),
    );
}

fn ids(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.id.as_str()).collect()
}

fn like_count(store: &MemoryStore, id: &str) -> i64 {
    store
        .document("articles", id)
        .and_then(|doc| doc.get("likeCount").and_then(Value::as_i64))
        .unwrap_or_default()
}

#[tokio::test]
async fn all_articles_emits_loading_then_one_success_per_change() {
    let (store, repo) = setup();
    seed_article(&store, "a1", "sports", 100, true);

    let mut states = repo.all_articles();
    assert_eq!(states.recv().await, Some(Resource::Loading));
    let first = states.recv().await.unwrap().into_data().unwrap();
    assert_eq!(ids(&first), vec!["a1"]);

    seed_article(&store, "a2", "events", 200, true);
    let second = states.recv().await.unwrap().into_data().unwrap();
    assert_eq!(ids(&second), vec!["a2", "a1"]);

    // Unpublished articles do not change the result set.
    seed_article(&store, "draft", "events", 300, false);
    seed_article(&store, "a3", "other", 50, true);
    let third = states.recv().await.unwrap().into_data().unwrap();
    assert_eq!(ids(&third), vec!["a2", "a1", "a3"]);

    states.unsubscribe();
    assert_eq!(store.active_listeners(), 0);
}

#[tokio::test]
async fn live_listener_errors_surface_and_keep_the_subscription() {
    let (store, repo) = setup();
    let mut states = repo.all_articles();
    assert_eq!(states.recv().await, Some(Resource::Loading));
    assert_eq!(states.recv().await, Some(Resource::Success(vec![])));

    store.fail_listeners("articles", "permission denied");
    assert_eq!(
        states.recv().await,
        Some(Resource::Error("permission denied".into()))
    );

    seed_article(&store, "a1", "sports", 1, true);
    let after = states.recv().await.unwrap().into_data().unwrap();
    assert_eq!(ids(&after), vec!["a1"]);
}

#[tokio::test]
async fn missing_article_reports_not_found() {
    let (store, repo) = setup();
    let mut states = repo.article(&ArticleId::from("ghost"));
    assert_eq!(states.recv().await, Some(Resource::Loading));
    assert_eq!(
        states.recv().await,
        Some(Resource::Error("Article not found".into()))
    );

    seed_article(&store, "ghost", "events", 5, true);
    let article = states.recv().await.unwrap().into_data().unwrap();
    assert_eq!(article.title, "Title ghost");
}

#[tokio::test]
async fn unparsable_article_reports_parse_failure() {
    let (store, repo) = setup();
    store.seed("articles", "bad", fields(json!({ "title": 12 })));
    let mut states = repo.article(&ArticleId::from("bad"));
    assert_eq!(
        states.settle().await,
        Some(Resource::Error("Failed to parse article data".into()))
    );
}

#[tokio::test]
async fn search_matches_case_insensitively_over_published_only() {
    let (store, repo) = setup();
    seed_article(&store, "a1", "sports", 1, true);
    store.seed(
        "articles",
        "a2",
        fields(json!({ "title": "Graduation FAIR", "published": true, "publishedAt": 2 })),
    );
    store.seed(
        "articles",
        "a3",
        fields(json!({ "title": "graduation draft", "published": false, "publishedAt": 3 })),
    );

    let mut states = repo.search_articles("GRADUATION");
    assert_eq!(states.recv().await, Some(Resource::Loading));
    let found = states.recv().await.unwrap().into_data().unwrap();
    assert_eq!(ids(&found), vec!["a2"]);
    assert_eq!(states.recv().await, None);

    // Surrounding whitespace is part of the needle.
    let padded = repo.search_articles(" graduation ").settle().await;
    assert_eq!(padded, Some(Resource::Success(vec![])));
}

#[tokio::test]
async fn one_shot_reads_emit_exactly_one_terminal_state() {
    let (store, repo) = setup();
    store.fail_next(StoreOp::Query, "articles", "");

    let mut states = repo.search_articles("x");
    assert_eq!(states.recv().await, Some(Resource::Loading));
    assert_eq!(
        states.recv().await,
        Some(Resource::Error("Unknown error occurred during search".into()))
    );
    assert_eq!(states.recv().await, None);
}

#[tokio::test]
async fn category_filter_orders_newest_first() {
    let (store, repo) = setup();
    seed_article(&store, "s1", "sports", 10, true);
    seed_article(&store, "s2", "sports", 30, true);
    seed_article(&store, "e1", "events", 20, true);
    seed_article(&store, "s3", "sports", 40, false);

    let sports = repo
        .articles_by_category(&CategoryFilter::Only(Category::Sports))
        .settle()
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(ids(&sports), vec!["s2", "s1"]);

    let all = repo
        .articles_by_category(&CategoryFilter::All)
        .settle()
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(ids(&all), vec!["s2", "e1", "s1"]);
}

#[tokio::test]
async fn saved_articles_are_fetched_in_bounded_chunks() {
    let (store, repo) = setup();
    let saved: Vec<String> = (0..25).map(|i| format!("a{i:02}")).collect();
    for (i, id) in saved.iter().enumerate() {
        // Every fifth article has been unpublished since it was saved.
        seed_article(&store, id, "events", i as i64, i % 5 != 0);
    }
    store.seed("users", "u1", fields(json!({ "savedArticles": saved })));
    store.clear_calls();

    let articles = repo
        .saved_articles(&UserId::from("u1"))
        .settle()
        .await
        .unwrap()
        .into_data()
        .unwrap();

    assert_eq!(store.call_count(StoreOp::Query, "articles"), 3);
    let mut found: Vec<_> = ids(&articles).into_iter().map(str::to_string).collect();
    found.sort();
    let expected: Vec<_> = saved
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 5 != 0)
        .map(|(_, id)| id.clone())
        .collect();
    assert_eq!(found, expected);
}

#[tokio::test]
async fn saved_articles_short_circuit_without_ids() {
    let (store, repo) = setup();
    store.seed("users", "u1", Fields::new());

    let none = repo.saved_articles(&UserId::from("u1")).settle().await;
    assert_eq!(none, Some(Resource::Success(vec![])));
    let missing = repo.saved_articles(&UserId::from("nobody")).settle().await;
    assert_eq!(missing, Some(Resource::Success(vec![])));
    assert_eq!(store.call_count(StoreOp::Query, "articles"), 0);
}

#[tokio::test]
async fn save_and_unsave_keep_one_entry() {
    let (store, repo) = setup();
    store.seed("users", "u1", Fields::new());
    let user = UserId::from("u1");
    let article = ArticleId::from("a1");

    for _ in 0..2 {
        let saved = repo.save_article(&user, &article).settle().await;
        assert_eq!(saved, Some(Resource::Success(true)));
    }
    assert_eq!(
        store.document("users", "u1").unwrap()["savedArticles"],
        json!(["a1"])
    );

    let unsaved = repo.unsave_article(&user, &article).settle().await;
    assert_eq!(unsaved, Some(Resource::Success(true)));
    assert_eq!(
        store.document("users", "u1").unwrap()["savedArticles"],
        json!([])
    );

    store.fail_next(StoreOp::Update, "users", "");
    assert_eq!(
        repo.save_article(&user, &article).settle().await,
        Some(Resource::Error("Failed to save article".into()))
    );
}

#[tokio::test]
async fn add_article_stamps_server_time_and_zero_counts() {
    let (store, repo) = setup();
    let mut draft = NewArticle::new("Fresh", "Short", "Body", Category::Announcements);
    draft.id = Some(ArticleId::from("chosen"));
    draft.author_id = UserId::from("admin");
    draft.author_name = "Admin".into();

    let id = repo.add_article(draft).settle().await.unwrap().into_data().unwrap();
    assert_eq!(id, ArticleId::from("chosen"));

    let stored = store.document("articles", "chosen").unwrap();
    assert!(stored["publishedAt"].as_i64().unwrap() > 0);
    assert_eq!(stored["likeCount"], 0);
    assert_eq!(stored["commentCount"], 0);
    assert_eq!(stored["category"], "announcements");
    assert_eq!(stored["published"], true);
}

#[tokio::test]
async fn add_article_generates_an_id_when_blank() {
    let (store, repo) = setup();
    let mut draft = NewArticle::new("Fresh", "Short", "Body", Category::Events);
    draft.id = Some(ArticleId::from(""));

    let id = repo.add_article(draft).settle().await.unwrap().into_data().unwrap();
    assert!(!id.is_blank());
    assert!(store.document("articles", id.as_str()).is_some());
}

#[tokio::test]
async fn invalid_article_is_rejected_before_any_call() {
    let (store, repo) = setup();
    let draft = NewArticle::new("", "Short", "Body", Category::Events);

    let mut states = repo.add_article(draft);
    assert_eq!(states.recv().await, Some(Resource::Loading));
    assert_eq!(
        states.recv().await,
        Some(Resource::Error("Article title is required".into()))
    );
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn comments_stream_newest_first_and_bump_the_count() {
    let (store, repo) = setup();
    seed_article(&store, "a1", "events", 1, true);
    let article = ArticleId::from("a1");

    let mut comments = repo.comments(&article);
    assert_eq!(comments.recv().await, Some(Resource::Loading));
    assert_eq!(comments.recv().await, Some(Resource::Success(vec![])));

    for text in ["first", "  second  "] {
        let posted = repo
            .add_comment(NewComment {
                article_id: article.clone(),
                user_id: UserId::from("u1"),
                user_display_name: "Reader".into(),
                text: text.into(),
            })
            .settle()
            .await;
        assert!(posted.unwrap().is_success());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let mut latest = Vec::new();
    while latest.len() < 2 {
        latest = comments.recv().await.unwrap().into_data().unwrap();
    }
    assert_eq!(latest[1].text, "first");
    assert_eq!(latest[0].text, "second");
    assert!(latest[0].created_at >= latest[1].created_at);
    assert_eq!(
        store.document("articles", "a1").unwrap()["commentCount"],
        2
    );
}

#[tokio::test]
async fn blank_comment_is_rejected_without_backend_calls() {
    let (store, repo) = setup();
    let mut states = repo.add_comment(NewComment {
        article_id: ArticleId::from("a1"),
        user_id: UserId::from("u1"),
        user_display_name: "Reader".into(),
        text: "   ".into(),
    });
    assert_eq!(states.recv().await, Some(Resource::Loading));
    assert_eq!(
        states.recv().await,
        Some(Resource::Error("Comment cannot be empty".into()))
    );
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn like_then_unlike_round_trips_the_count() {
    let (store, repo) = setup();
    seed_article(&store, "a1", "events", 1, true);
    let user = UserId::from("u1");
    let article = ArticleId::from("a1");

    let liked = repo.toggle_like(&user, &article, true).settle().await;
    assert_eq!(liked, Some(Resource::Success(true)));
    assert_eq!(like_count(&store, "a1"), 1);
    assert_eq!(
        repo.is_article_liked(&user, &article).settle().await,
        Some(Resource::Success(true))
    );

    let unliked = repo.toggle_like(&user, &article, false).settle().await;
    assert_eq!(unliked, Some(Resource::Success(true)));
    assert_eq!(like_count(&store, "a1"), 0);
    assert_eq!(
        repo.is_article_liked(&user, &article).settle().await,
        Some(Resource::Success(false))
    );
}

#[tokio::test]
async fn marker_failure_leaves_count_untouched() {
    let (store, repo) = setup();
    seed_article(&store, "a1", "events", 1, true);
    store.fail_next(StoreOp::Set, "users/u1/likes", "");

    let result = repo
        .toggle_like(&UserId::from("u1"), &ArticleId::from("a1"), true)
        .settle()
        .await;
    assert_eq!(result, Some(Resource::Error("Failed to toggle like".into())));
    assert_eq!(like_count(&store, "a1"), 0);
    assert!(store.document("users/u1/likes", "a1").is_none());
    assert_eq!(store.call_count(StoreOp::Update, "articles"), 0);
}

#[tokio::test]
async fn count_failure_after_marker_leaves_them_out_of_step() {
    let (store, repo) = setup();
    seed_article(&store, "a1", "events", 1, true);
    store.fail_next(StoreOp::Update, "articles", "quota exceeded");

    let result = repo
        .toggle_like(&UserId::from("u1"), &ArticleId::from("a1"), true)
        .settle()
        .await;
    assert_eq!(result, Some(Resource::Error("quota exceeded".into())));
    assert!(store.document("users/u1/likes", "a1").is_some());
    assert_eq!(like_count(&store, "a1"), 0);
}

#[tokio::test]
async fn comment_author_name_prefers_session_then_profile() {
    let (store, repo) = setup();
    store.seed("users", "u1", fields(json!({ "displayName": "Profile Name" })));

    let mut user = auth_engine::AuthUser {
        user_id: UserId::from("u1"),
        email: "u1@ndejje.ac.ug".into(),
        display_name: Some("Session Name".into()),
    };
    assert_eq!(repo.comment_author_name(&user).await, "Session Name");

    user.display_name = None;
    assert_eq!(repo.comment_author_name(&user).await, "Profile Name");

    user.user_id = UserId::from("unknown");
    assert_eq!(repo.comment_author_name(&user).await, "Anonymous");

    store.fail_next(StoreOp::Get, "users", "offline");
    user.user_id = UserId::from("u1");
    assert_eq!(repo.comment_author_name(&user).await, "Anonymous");
}

#[tokio::test]
async fn custom_chunk_size_changes_query_count() {
    let store = MemoryStore::new();
    let repo = NewsRepository::new(
        Arc::new(store.clone()),
        RepositoryConfig { in_query_limit: 4 },
    );
    let saved: Vec<String> = (0..9).map(|i| format!("a{i}")).collect();
    for id in &saved {
        seed_article(&store, id, "events", 1, true);
    }
    store.seed("users", "u1", fields(json!({ "savedArticles": saved })));

    let articles = repo
        .saved_articles(&UserId::from("u1"))
        .settle()
        .await
        .unwrap()
        .into_data()
        .unwrap();
    assert_eq!(articles.len(), 9);
    assert_eq!(store.call_count(StoreOp::Query, "articles"), 3);

    // The store itself still rejects oversized `in` lists.
    let oversized = saved.iter().map(String::as_str).chain(["x", "y"]);
    let query = doc_store::Query::collection("articles").where_in("id", oversized);
    assert!(store.query(&query).await.is_err());
}
