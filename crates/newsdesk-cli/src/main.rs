//! Newsdesk - developer tool for exercising the sync adapters against a
//! seeded in-memory backend.

mod fixture;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use doc_store::MemoryStore;
use news_model::{Article, ArticleId, CategoryFilter, Resource, UserId};
use news_sync::{NewsRepository, RepositoryConfig, ResourceStream};
use newsdesk_config::{init_logging, Config, Paths};
use tracing::info;

/// Newsdesk command-line interface.
#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(about = "Query newsdesk data through the sync adapters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.newsdesk
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// JSON fixture used to seed the in-memory store
    #[arg(long, global = true, env = "NEWSDESK_FIXTURE")]
    fixture: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List published articles, newest first
    Articles {
        /// Category name, or "all"
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Search titles, summaries and content
    Search { query: String },
    /// Show one article with its comments
    Article {
        id: String,
        /// Also report whether this user likes the article
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List a user's saved articles
    Saved {
        #[arg(short, long)]
        user: String,
    },
    /// Follow the article list until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;
    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&level, &paths)?;

    let store = MemoryStore::new();
    if let Some(path) = cli.fixture.or(config.fixture_path.clone()) {
        let documents = fixture::load(&store, &path)?;
        info!(documents, path = %path.display(), "fixture loaded");
    }
    let repo = NewsRepository::new(
        Arc::new(store),
        RepositoryConfig {
            in_query_limit: config.in_query_limit,
        },
    );

    match cli.command {
        Commands::Articles { category } => {
            let mut states = match category {
                Some(category) => repo.articles_by_category(&category.parse::<CategoryFilter>()?),
                None => repo.all_articles(),
            };
            let articles = settle(&mut states).await?;
            states.unsubscribe();
            print_articles(&articles);
        }
        Commands::Search { query } => {
            let articles = settle(&mut repo.search_articles(&query)).await?;
            print_articles(&articles);
        }
        Commands::Article { id, user } => {
            let id = ArticleId::from(id);
            let article = settle(&mut repo.article(&id)).await?;
            println!("{}", article.title);
            println!(
                "{} | {} | {} likes | {} comments",
                article.category, article.author_name, article.like_count, article.comment_count
            );
            println!();
            println!("{}", article.content);

            if let Some(user) = user {
                let liked = settle(&mut repo.is_article_liked(&UserId::from(user), &id)).await?;
                println!();
                println!("liked: {liked}");
            }

            let comments = settle(&mut repo.comments(&id)).await?;
            println!();
            for comment in comments {
                println!("- {}: {}", comment.user_display_name, comment.text);
            }
        }
        Commands::Saved { user } => {
            let articles = settle(&mut repo.saved_articles(&UserId::from(user))).await?;
            print_articles(&articles);
        }
        Commands::Watch => watch(&repo).await?,
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error("{0}")]
    Failed(String),

    #[error("Operation ended without a result")]
    NoResult,
}

/// First terminal state of `states`, as a command result.
async fn settle<T>(states: &mut ResourceStream<T>) -> Result<T, CommandError> {
    match states.settle().await {
        Some(Resource::Success(data)) => Ok(data),
        Some(Resource::Error(message)) => Err(CommandError::Failed(message)),
        Some(Resource::Loading) | None => Err(CommandError::NoResult),
    }
}

fn print_articles(articles: &[Article]) {
    for article in articles {
        println!(
            "{}  [{}]  {}  ({})",
            article.id,
            article.category,
            article.title,
            article.published_at.format("%Y-%m-%d %H:%M")
        );
    }
    if articles.is_empty() {
        println!("no articles");
    }
}

async fn watch(repo: &NewsRepository) -> Result<(), CommandError> {
    let mut states = repo.all_articles();
    loop {
        tokio::select! {
            state = states.recv() => match state {
                Some(Resource::Loading) => println!("loading..."),
                Some(Resource::Success(articles)) => {
                    println!("{} articles", articles.len());
                    print_articles(&articles);
                }
                Some(Resource::Error(message)) => eprintln!("error: {message}"),
                None => return Err(CommandError::NoResult),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, unsubscribing");
                states.unsubscribe();
                return Ok(());
            }
        }
    }
}
