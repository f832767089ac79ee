//! feedhook - feed article placeholders for webhook delivery
//!
//! Connections turn feed articles into chat messages. Each connection can
//! define custom placeholders (regex rewrites of an article field) and
//! external properties (values scraped from the page an article links to),
//! and preview the projected article before saving.

pub mod article;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod format;
pub mod logging;
pub mod placeholder;
pub mod preview;
pub mod projection;
pub mod store;
pub mod web;

pub use article::{Article, ArticleSource, FeedArticleSource, StaticArticleSource};
pub use config::Config;
pub use error::{FeedhookError, Result};
pub use placeholder::{CustomPlaceholder, Definitions, ExternalProperty, PlaceholderStep};
pub use preview::{PreviewInput, PreviewOutput, PreviewService};
pub use projection::ProjectionEngine;
pub use store::{Connection, ConnectionStore, ConnectionTarget};
pub use web::WebServer;
