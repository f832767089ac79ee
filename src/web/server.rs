//! Web server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::article::ArticleSource;
use crate::config::Config;
use crate::extract::ExternalPropertyExtractor;
use crate::preview::PreviewService;
use crate::projection::ProjectionEngine;
use crate::store::ConnectionStore;
use crate::{FeedhookError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server serving articles from `articles`.
    pub fn new(config: &Config, articles: Arc<dyn ArticleSource>) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| FeedhookError::Config(format!("invalid server address: {e}")))?;

        let extractor = ExternalPropertyExtractor::new(&config.extractor)
            .map_err(|e| FeedhookError::Http(e.to_string()))?;
        let engine = ProjectionEngine::new(Arc::new(extractor));
        let connections = Arc::new(ConnectionStore::new());
        let preview = PreviewService::new(
            articles,
            engine,
            connections.clone(),
            config.preview.clone(),
        );

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(connections, Arc::new(preview))),
            cors_origins: config.server.cors_origins.clone(),
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the complete router.
    pub fn router(&self) -> Router {
        create_router(self.app_state.clone(), &self.cors_origins).merge(create_health_router())
    }

    /// Run the web server.
    pub async fn run(self) -> Result<()> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let router = self.router();
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
