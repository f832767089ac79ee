//! Shared helpers for the web API tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};

use feedhook::article::{Article, ArticleSource};
use feedhook::{Config, StaticArticleSource, WebServer};

/// Feed id the static article source serves.
pub const FEED_ID: &str = "feed-1";

/// Articles of the test feed.
pub fn sample_articles() -> Vec<Article> {
    vec![
        Article::new("a1")
            .with_field("title", "banana")
            .with_field("link", "https://example.com/a1"),
        Article::new("a2")
            .with_field("title", "Second post")
            .with_field("description", "Line one\nLine two"),
    ]
}

/// Build a test server over `articles`.
pub fn create_test_server_with(articles: Arc<dyn ArticleSource>) -> TestServer {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.preview.random_sample = false;

    let server = WebServer::new(&config, articles).expect("Failed to create web server");
    TestServer::new(server.router()).expect("Failed to create test server")
}

/// Build a test server serving [`sample_articles`].
pub fn create_test_server() -> TestServer {
    let source = StaticArticleSource::new();
    source.insert(FEED_ID, sample_articles());
    create_test_server_with(Arc::new(source))
}

/// Connections path of the test feed.
pub fn connections_path() -> String {
    format!("/api/feeds/{FEED_ID}/connections")
}

/// Create a channel connection and return its id.
pub async fn create_connection(server: &TestServer, name: &str) -> String {
    let response = server
        .post(&connections_path())
        .json(&json!({ "name": name, "channelId": "chan-1" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    body["data"]["id"].as_str().unwrap().to_string()
}
