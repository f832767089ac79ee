//! Article projection.
//!
//! Produces the augmented article: the original fields, one
//! `external::<label>` field per resolved external property, and one
//! `custom::<referenceName>` field per custom placeholder. Broken or
//! incomplete definitions are skipped so the rest still project.
//!
//! Custom placeholders may use external property values as their source.
//! They never read each other's output, so their relative order does not
//! matter.

mod report;

use std::sync::Arc;

use futures::future::join_all;

use crate::article::{custom_key, external_key, Article};
use crate::extract::ExternalPropertyExtractor;
use crate::fetcher::is_http_url;
use crate::placeholder::{
    CompiledStep, CustomPlaceholder, Definitions, ExternalProperty, PatternError,
};

pub use report::{DefinitionFailure, FailureKind, Projection};

/// Run a placeholder's steps over its source value.
///
/// A missing source field yields an empty working value.
pub fn evaluate_placeholder(
    placeholder: &CustomPlaceholder,
    article: &Article,
) -> Result<String, PatternError> {
    let mut value = article
        .get(&placeholder.source_placeholder)
        .unwrap_or_default()
        .to_string();

    for step in &placeholder.steps {
        value = CompiledStep::compile(step)?.apply(&value);
    }

    Ok(value)
}

/// Evaluate every usable placeholder against `article`.
///
/// Returns the derived `(key, value)` pairs and the failures.
pub fn apply_custom_placeholders(
    article: &Article,
    placeholders: &[CustomPlaceholder],
) -> (Vec<(String, String)>, Vec<DefinitionFailure>) {
    let mut values = Vec::new();
    let mut failures = Vec::new();

    for placeholder in placeholders.iter().filter(|p| p.is_usable()) {
        match evaluate_placeholder(placeholder, article) {
            Ok(value) => values.push((custom_key(&placeholder.reference_name), value)),
            Err(e) => {
                tracing::warn!(
                    "Skipping custom placeholder {} ({}): {}",
                    placeholder.reference_name,
                    placeholder.id,
                    e
                );
                failures.push(DefinitionFailure::pattern(&placeholder.id, &e));
            }
        }
    }

    (values, failures)
}

/// Projects articles against definitions.
#[derive(Debug, Clone)]
pub struct ProjectionEngine {
    extractor: Arc<ExternalPropertyExtractor>,
}

impl ProjectionEngine {
    /// Create an engine backed by `extractor`.
    pub fn new(extractor: Arc<ExternalPropertyExtractor>) -> Self {
        Self { extractor }
    }

    /// Project `article` with `definitions`.
    ///
    /// Never fails: problems are reported per definition in
    /// [`Projection::failures`].
    pub async fn project(&self, article: &Article, definitions: &Definitions) -> Projection {
        let mut augmented = article.clone();
        let mut failures = Vec::new();

        let (external_values, external_failures) = self
            .resolve_external_properties(article, &definitions.external_properties)
            .await;
        for (key, value) in external_values {
            augmented.insert(key, value);
        }
        failures.extend(external_failures);

        let (custom_values, custom_failures) =
            apply_custom_placeholders(&augmented, &definitions.custom_placeholders);
        for (key, value) in custom_values {
            augmented.insert(key, value);
        }
        failures.extend(custom_failures);

        Projection {
            article: augmented,
            failures,
        }
    }

    /// Resolve external properties concurrently and wait for all of them.
    async fn resolve_external_properties(
        &self,
        article: &Article,
        properties: &[ExternalProperty],
    ) -> (Vec<(String, String)>, Vec<DefinitionFailure>) {
        let pending = properties
            .iter()
            .filter(|p| p.is_complete())
            .filter_map(|property| match article.get(&property.source_field) {
                Some(url) if is_http_url(url) => Some((property, url.trim().to_string())),
                _ => {
                    tracing::debug!(
                        "External property {} skipped: field '{}' holds no URL",
                        property.id,
                        property.source_field
                    );
                    None
                }
            })
            .map(|(property, url)| async move {
                let outcome = self.extractor.extract(&url, &property.css_selector).await;
                (property, outcome)
            });

        let mut values = Vec::new();
        let mut failures = Vec::new();
        for (property, outcome) in join_all(pending).await {
            match outcome {
                Ok(value) => values.push((external_key(&property.label), value)),
                Err(e) => failures.push(DefinitionFailure::extraction(&property.id, &e)),
            }
        }

        (values, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorConfig;
    use crate::placeholder::PlaceholderStep;

    fn engine() -> ProjectionEngine {
        let extractor = ExternalPropertyExtractor::new(&ExtractorConfig::default()).unwrap();
        ProjectionEngine::new(Arc::new(extractor))
    }

    fn article() -> Article {
        Article::new("a1")
            .with_field("title", "banana")
            .with_field("description", "Line one\nLine two")
    }

    fn placeholder(name: &str, source: &str, steps: Vec<PlaceholderStep>) -> CustomPlaceholder {
        let mut placeholder = CustomPlaceholder::new(name, source);
        placeholder.steps = steps;
        placeholder
    }

    #[tokio::test]
    async fn test_empty_definitions_is_identity() {
        let projection = engine().project(&article(), &Definitions::default()).await;
        assert_eq!(projection.article, article());
        assert!(projection.is_complete());
    }

    #[tokio::test]
    async fn test_single_regex_step() {
        let definitions = Definitions {
            custom_placeholders: vec![placeholder(
                "swapped",
                "title",
                vec![PlaceholderStep::regex("a", "b").with_flags("g")],
            )],
            ..Definitions::default()
        };

        let projection = engine().project(&article(), &definitions).await;
        assert_eq!(projection.article.get("custom::swapped"), Some("bbnbnb"));
        assert_eq!(projection.article.get("title"), Some("banana"));
    }

    #[test]
    fn test_steps_apply_in_order() {
        let first = PlaceholderStep::regex("a", "b").with_flags("g");
        let second = PlaceholderStep::regex("b", "c").with_flags("g");

        let forward = placeholder("p", "title", vec![first.clone(), second.clone()]);
        let reversed = placeholder("p", "title", vec![second, first]);

        assert_eq!(evaluate_placeholder(&forward, &article()).unwrap(), "ccncnc");
        assert_eq!(evaluate_placeholder(&reversed, &article()).unwrap(), "cbnbnb");
    }

    #[tokio::test]
    async fn test_projection_is_idempotent() {
        let definitions = Definitions {
            custom_placeholders: vec![placeholder(
                "first_line",
                "description",
                vec![PlaceholderStep::regex("\n.*", "").with_flags("g")],
            )],
            ..Definitions::default()
        };
        let engine = engine();

        let once = engine.project(&article(), &definitions).await;
        let twice = engine.project(&once.article, &definitions).await;
        assert_eq!(once.article.get("custom::first_line"), Some("Line one"));
        assert_eq!(once.article, twice.article);
    }

    #[tokio::test]
    async fn test_missing_source_yields_empty_string() {
        let definitions = Definitions {
            custom_placeholders: vec![placeholder(
                "author",
                "author",
                vec![PlaceholderStep::regex("x", "y")],
            )],
            ..Definitions::default()
        };

        let projection = engine().project(&article(), &definitions).await;
        assert_eq!(projection.article.get("custom::author"), Some(""));
        assert!(projection.is_complete());
    }

    #[tokio::test]
    async fn test_corrupt_placeholder_is_skipped_and_reported() {
        let mut broken = placeholder("broken", "title", vec![PlaceholderStep::regex("(", "")]);
        broken.id = "broken-id".to_string();
        let definitions = Definitions {
            custom_placeholders: vec![
                broken,
                placeholder("ok", "title", vec![PlaceholderStep::regex("n", "N")]),
            ],
            ..Definitions::default()
        };

        let projection = engine().project(&article(), &definitions).await;
        assert_eq!(projection.article.get("custom::broken"), None);
        assert_eq!(projection.article.get("custom::ok"), Some("baNaNa"));
        assert_eq!(projection.failures.len(), 1);
        assert_eq!(projection.failures[0].definition_id, "broken-id");
        assert_eq!(projection.failures[0].kind, FailureKind::InvalidPattern);
    }

    #[tokio::test]
    async fn test_incomplete_definitions_are_skipped_silently() {
        let definitions = Definitions {
            custom_placeholders: vec![
                placeholder("", "title", vec![PlaceholderStep::regex("a", "b")]),
                placeholder("no_steps", "title", vec![]),
            ],
            external_properties: vec![ExternalProperty::new("link", "", "image")],
        };

        let projection = engine().project(&article(), &definitions).await;
        assert_eq!(projection.article, article());
        assert!(projection.is_complete());
    }

    #[tokio::test]
    async fn test_external_property_without_url_is_skipped() {
        let definitions = Definitions {
            external_properties: vec![
                ExternalProperty::new("link", "h1", "missing_field"),
                ExternalProperty::new("title", "h1", "not_a_url"),
            ],
            ..Definitions::default()
        };

        let projection = engine().project(&article(), &definitions).await;
        assert_eq!(projection.article, article());
        assert!(projection.failures.is_empty());
    }

    #[tokio::test]
    async fn test_forbidden_url_reports_fetch_failure() {
        let mut property = ExternalProperty::new("link", "h1", "heading");
        property.id = "ext-1".to_string();
        let definitions = Definitions {
            external_properties: vec![property],
            ..Definitions::default()
        };
        let source = article().with_field("link", "http://127.0.0.1:9/page");

        let projection = engine().project(&source, &definitions).await;
        assert_eq!(projection.article, source);
        assert_eq!(projection.failures.len(), 1);
        assert_eq!(projection.failures[0].definition_id, "ext-1");
        assert_eq!(projection.failures[0].kind, FailureKind::Fetch);
    }

    mod remote {
        use super::*;
        use axum::response::Html;
        use axum::routing::get;
        use axum::Router;
        use std::time::{Duration, Instant};

        async fn slow_a() -> Html<&'static str> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Html(r#"<img class="hero" src="https://cdn.example.com/a.png"><h1>Alpha</h1>"#)
        }

        async fn slow_b() -> Html<&'static str> {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Html("<h1>Beta</h1>")
        }

        async fn spawn_server() -> String {
            let app = Router::new()
                .route("/a", get(slow_a))
                .route("/b", get(slow_b));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let address = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{address}")
        }

        fn local_engine() -> ProjectionEngine {
            let config = ExtractorConfig {
                allow_private_hosts: true,
                fetch_timeout_ms: 2000,
                max_retries: 0,
                ..ExtractorConfig::default()
            };
            ProjectionEngine::new(Arc::new(ExternalPropertyExtractor::new(&config).unwrap()))
        }

        #[tokio::test]
        async fn test_external_properties_resolve_concurrently() {
            let base = spawn_server().await;
            let source = Article::new("a1")
                .with_field("link", format!("{base}/a"))
                .with_field("comments", format!("{base}/b"));
            let definitions = Definitions {
                external_properties: vec![
                    ExternalProperty::new("link", "h1", "heading"),
                    ExternalProperty::new("comments", "h1", "comments_heading"),
                ],
                ..Definitions::default()
            };

            let started = Instant::now();
            let projection = local_engine().project(&source, &definitions).await;
            let elapsed = started.elapsed();

            assert!(projection.is_complete(), "{:?}", projection.failures);
            assert_eq!(projection.article.get("external::heading"), Some("Alpha"));
            assert_eq!(projection.article.get("external::comments_heading"), Some("Beta"));
            assert!(elapsed < Duration::from_millis(550), "took {elapsed:?}");
        }

        #[tokio::test]
        async fn test_failed_fetch_leaves_other_values_intact() {
            let base = spawn_server().await;
            let source = Article::new("a1")
                .with_field("title", "banana")
                .with_field("link", format!("{base}/a"))
                .with_field("broken", format!("{base}/does-not-exist"));
            let mut broken = ExternalProperty::new("broken", "h1", "broken_heading");
            broken.id = "broken-ext".to_string();
            let definitions = Definitions {
                custom_placeholders: vec![placeholder(
                    "shout",
                    "title",
                    vec![PlaceholderStep::regex("banana", "BANANA")],
                )],
                external_properties: vec![
                    ExternalProperty::new("link", "img.hero@src", "image"),
                    broken,
                ],
            };

            let projection = local_engine().project(&source, &definitions).await;

            assert_eq!(
                projection.article.get("external::image"),
                Some("https://cdn.example.com/a.png")
            );
            assert_eq!(projection.article.get("external::broken_heading"), None);
            assert_eq!(projection.article.get("custom::shout"), Some("BANANA"));
            assert_eq!(projection.failures.len(), 1);
            assert_eq!(projection.failures[0].definition_id, "broken-ext");
            assert_eq!(projection.failures[0].kind, FailureKind::Fetch);
        }

        #[tokio::test]
        async fn test_custom_placeholder_can_read_external_value() {
            let base = spawn_server().await;
            let source = Article::new("a1").with_field("link", format!("{base}/b"));
            let definitions = Definitions {
                custom_placeholders: vec![placeholder(
                    "lower",
                    "external::heading",
                    vec![PlaceholderStep::regex("B", "b")],
                )],
                external_properties: vec![ExternalProperty::new("link", "h1", "heading")],
            };

            let projection = local_engine().project(&source, &definitions).await;
            assert_eq!(projection.article.get("custom::lower"), Some("beta"));
        }
    }
}
