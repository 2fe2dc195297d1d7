use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ArticleId, UserId};

/// Article category as stored in the `category` field.
///
/// Unknown values read from the store are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Academics,
    Sports,
    Events,
    Announcements,
    Other(String),
}

impl Category {
    /// The categories users can publish under, in menu order.
    pub const PUBLISHABLE: [Category; 4] = [
        Category::Academics,
        Category::Sports,
        Category::Events,
        Category::Announcements,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Category::Academics => "academics",
            Category::Sports => "sports",
            Category::Events => "events",
            Category::Announcements => "announcements",
            Category::Other(raw) => raw,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other(String::new())
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "academics" => Category::Academics,
            "sports" => Category::Sports,
            "events" => Category::Events,
            "announcements" => Category::Announcements,
            _ => Category::Other(raw),
        }
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        Category::from(raw.to_string())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category selector for list screens. `"all"` maps to [`CategoryFilter::All`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub const ALL: &'static str = "all";

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => Self::ALL,
            CategoryFilter::Only(category) => category.as_str(),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == Self::ALL {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Only(Category::from(s)))
        }
    }
}

impl From<Category> for CategoryFilter {
    fn from(category: Category) -> Self {
        CategoryFilter::Only(category)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A news article document from the `articles` collection.
///
/// `published_at` is assigned by the store when the article is created.
/// `like_count` and `comment_count` only move through atomic increments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub image_url: String,
    pub author_id: UserId,
    pub author_name: String,
    pub category: Category,
    pub published: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub published_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
}

impl Default for Article {
    fn default() -> Self {
        Self {
            id: ArticleId::default(),
            title: String::new(),
            summary: String::new(),
            content: String::new(),
            image_url: String::new(),
            author_id: UserId::default(),
            author_name: String::new(),
            category: Category::default(),
            published: true,
            published_at: DateTime::<Utc>::default(),
            like_count: 0,
            comment_count: 0,
        }
    }
}

impl Article {
    /// Case-insensitive substring match over title, content and summary.
    ///
    /// `needle` must already be lowercase.
    pub fn matches_search(&self, needle: &str) -> bool {
        [&self.title, &self.content, &self.summary]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Draft submitted from the admin form.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    /// Client-chosen id; a blank id gets a generated UUID.
    pub id: Option<ArticleId>,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub image_url: String,
    pub category: Category,
    pub author_id: UserId,
    pub author_name: String,
    pub published: bool,
}

impl NewArticle {
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        content: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            summary: summary.into(),
            content: content.into(),
            image_url: String::new(),
            category,
            author_id: UserId::default(),
            author_name: String::new(),
            published: true,
        }
    }
}
