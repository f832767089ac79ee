//! Article previews.
//!
//! Shows a user what an article looks like after projection, with either
//! the saved definitions of a connection or pending edits that have not
//! been saved yet.

mod session;

use std::sync::Arc;

use rand::seq::IndexedRandom;
use serde::Serialize;

use crate::article::{Article, ArticleSource, EXTERNAL_PREFIX};
use crate::config::PreviewConfig;
use crate::format::{DeliveryMessage, MessageTemplate};
use crate::placeholder::{CustomPlaceholder, Definitions, ExternalProperty};
use crate::projection::{DefinitionFailure, ProjectionEngine};
use crate::store::{normalize_placeholders, ConnectionStore};
use crate::{FeedhookError, Result};

pub use session::{PreviewSessions, SessionKey, SessionOutcome};

/// Client session used when the caller does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// What to preview.
#[derive(Debug, Clone, Default)]
pub struct PreviewInput {
    /// Article to preview. Picks a sample article when absent.
    pub article_id: Option<String>,
    /// Pending custom placeholders. The saved ones are used when absent.
    pub custom_placeholders: Option<Vec<CustomPlaceholder>>,
    /// Pending external properties. The saved ones are used when absent.
    pub external_properties: Option<Vec<ExternalProperty>>,
    /// Fields to return; `*` (or nothing) returns all of them.
    pub select_properties: Vec<String>,
    /// Sample a random article instead of the first one.
    pub random: Option<bool>,
    /// Client session for last-write-wins tracking.
    pub session_id: Option<String>,
    /// Message template to render with the projected article.
    pub template: Option<MessageTemplate>,
}

/// A rendered preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOutput {
    /// The projected article.
    pub article: Article,
    /// Definitions that produced no value.
    pub failures: Vec<DefinitionFailure>,
    /// The rendered message, when a template was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<DeliveryMessage>,
}

/// Renders previews for connections.
pub struct PreviewService {
    articles: Arc<dyn ArticleSource>,
    engine: ProjectionEngine,
    connections: Arc<ConnectionStore>,
    sessions: PreviewSessions,
    config: PreviewConfig,
}

impl PreviewService {
    pub fn new(
        articles: Arc<dyn ArticleSource>,
        engine: ProjectionEngine,
        connections: Arc<ConnectionStore>,
        config: PreviewConfig,
    ) -> Self {
        Self {
            articles,
            engine,
            connections,
            sessions: PreviewSessions::new(),
            config,
        }
    }

    /// Preview a connection.
    ///
    /// Fails with [`FeedhookError::Superseded`] when a newer preview of the
    /// same session replaced this one.
    pub async fn preview(
        &self,
        feed_id: &str,
        connection_id: &str,
        mut input: PreviewInput,
    ) -> Result<PreviewOutput> {
        let connection = self.connections.get(feed_id, connection_id).await?;

        let key = SessionKey::new(
            connection_id,
            input
                .session_id
                .clone()
                .unwrap_or_else(|| DEFAULT_SESSION.to_string()),
        );
        // Pending patterns are normalized the way a save would normalize them.
        let definitions = Definitions {
            custom_placeholders: match input.custom_placeholders.take() {
                Some(pending) => normalize_placeholders(pending, &connection.custom_placeholders),
                None => connection.custom_placeholders,
            },
            external_properties: input
                .external_properties
                .take()
                .unwrap_or(connection.external_properties),
        };
        let random = input.random.unwrap_or(self.config.random_sample);

        let articles = self.articles.clone();
        let engine = self.engine.clone();
        let feed_id = feed_id.to_string();
        let task = async move {
            let feed_articles = articles.articles(&feed_id).await?;
            let article = select_article(feed_articles, input.article_id.as_deref(), random)?;
            let projection = engine.project(&article, &definitions).await;
            let message = input
                .template
                .as_ref()
                .map(|template| template.render(&projection.article));
            Ok::<_, FeedhookError>(PreviewOutput {
                article: shape_article(&projection.article, &input.select_properties),
                failures: projection.failures,
                message,
            })
        };

        match self.sessions.run(key, task).await {
            SessionOutcome::Completed(output) => output,
            SessionOutcome::Superseded => {
                tracing::debug!("Discarding stale preview for connection {}", connection_id);
                Err(FeedhookError::Superseded(
                    "a newer preview request replaced this one".to_string(),
                ))
            }
            SessionOutcome::Failed(e) => {
                tracing::error!("Preview task failed: {}", e);
                Err(FeedhookError::Internal(e))
            }
        }
    }
}

/// Pick the article to preview.
fn select_article(articles: Vec<Article>, article_id: Option<&str>, random: bool) -> Result<Article> {
    if let Some(id) = article_id {
        return articles
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| FeedhookError::NotFound(format!("article {id}")));
    }

    let chosen = if random {
        articles.choose(&mut rand::rng()).cloned()
    } else {
        articles.into_iter().next()
    };
    chosen.ok_or_else(|| FeedhookError::NotFound("article".to_string()))
}

/// Apply `selectProperties` and drop empty external values.
fn shape_article(article: &Article, select_properties: &[String]) -> Article {
    let mut shaped = article.select(select_properties);
    shaped
        .fields
        .retain(|key, value| !(key.starts_with(EXTERNAL_PREFIX) && value.is_empty()));
    shaped
}
