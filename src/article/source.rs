//! Article sources.
//!
//! The projection core only reads articles; where they come from is behind
//! the [`ArticleSource`] trait.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use feed_rs::model::Entry;
use scraper::Html;

use super::Article;
use crate::config::FeedSourceConfig;
use crate::error::{FeedhookError, Result};
use crate::fetcher::PageFetcher;

/// Provides the current articles of a feed.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Return the articles of `feed_id`, newest first.
    async fn articles(&self, feed_id: &str) -> Result<Vec<Article>>;
}

/// In-memory article source.
#[derive(Debug, Default)]
pub struct StaticArticleSource {
    feeds: RwLock<HashMap<String, Vec<Article>>>,
}

impl StaticArticleSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the articles of a feed.
    pub fn insert(&self, feed_id: impl Into<String>, articles: Vec<Article>) {
        let mut feeds = self.feeds.write().unwrap_or_else(|e| e.into_inner());
        feeds.insert(feed_id.into(), articles);
    }
}

#[async_trait]
impl ArticleSource for StaticArticleSource {
    async fn articles(&self, feed_id: &str) -> Result<Vec<Article>> {
        let feeds = self.feeds.read().unwrap_or_else(|e| e.into_inner());
        feeds
            .get(feed_id)
            .cloned()
            .ok_or_else(|| FeedhookError::NotFound(format!("feed {feed_id}")))
    }
}

/// Article source that fetches RSS/Atom/JSON feeds over HTTP.
pub struct FeedArticleSource {
    fetcher: PageFetcher,
    feeds: HashMap<String, String>,
}

impl FeedArticleSource {
    /// Create a source serving the configured feeds.
    pub fn new(fetcher: PageFetcher, feeds: &[FeedSourceConfig]) -> Self {
        Self {
            fetcher,
            feeds: feeds
                .iter()
                .map(|feed| (feed.id.clone(), feed.url.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl ArticleSource for FeedArticleSource {
    async fn articles(&self, feed_id: &str) -> Result<Vec<Article>> {
        let url = self
            .feeds
            .get(feed_id)
            .ok_or_else(|| FeedhookError::NotFound(format!("feed {feed_id}")))?;

        let bytes = self
            .fetcher
            .fetch_bytes(url)
            .await
            .map_err(|e| FeedhookError::ArticleSource(format!("failed to fetch feed: {e}")))?;

        parse_articles(&bytes)
    }
}

/// Parse a feed document into flattened articles.
pub(crate) fn parse_articles(bytes: &[u8]) -> Result<Vec<Article>> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| FeedhookError::ArticleSource(format!("failed to parse feed: {e}")))?;

    tracing::debug!("Parsed feed with {} entries", feed.entries.len());
    Ok(feed.entries.iter().map(flatten_entry).collect())
}

/// Flatten a feed entry into article fields.
///
/// Produces `title`, `link`, `description`, `content`, `author`, `pubdate`,
/// `guid`, `categories` and `image` when the entry carries them.
pub fn flatten_entry(entry: &Entry) -> Article {
    let link = entry.links.first().map(|l| l.href.clone());
    let title = entry.title.as_ref().map(|t| t.content.clone());
    let id = if !entry.id.trim().is_empty() {
        entry.id.clone()
    } else {
        link.clone()
            .or_else(|| title.clone())
            .unwrap_or_else(|| "unknown".to_string())
    };

    let mut article = Article::new(id);
    let mut set = |name: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            article.insert(name, value);
        }
    };

    let body = entry.content.as_ref().and_then(|c| c.body.clone());
    let description = entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .or_else(|| body.clone())
        .map(|html| html_to_text(&html));

    set("title", title);
    set("link", link);
    set("description", description);
    set("content", body);
    set("author", entry.authors.first().map(|a| a.name.clone()));
    set(
        "pubdate",
        entry.published.or(entry.updated).map(|d| d.to_rfc3339()),
    );
    set("guid", Some(entry.id.clone()));
    set(
        "categories",
        Some(
            entry
                .categories
                .iter()
                .map(|c| c.term.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
    );
    set(
        "image",
        entry.media.iter().find_map(|media| {
            media
                .thumbnails
                .first()
                .map(|t| t.image.uri.clone())
                .or_else(|| {
                    media
                        .content
                        .iter()
                        .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
                })
        }),
    );

    article
}

/// Reduce an HTML fragment to whitespace-collapsed text.
fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
