use std::sync::Arc;

use tracing::{error, info};

use feedhook::fetcher::PageFetcher;
use feedhook::{Config, FeedArticleSource, FeedhookError, WebServer};

#[tokio::main]
async fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = feedhook::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        feedhook::logging::init_console_only(&config.logging.level);
    }

    info!("feedhook starting");

    if let Err(e) = run(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> feedhook::Result<()> {
    config.validate()?;

    let fetcher =
        PageFetcher::new(&config.extractor).map_err(|e| FeedhookError::Http(e.to_string()))?;
    let articles = Arc::new(FeedArticleSource::new(fetcher, &config.feeds));
    info!("Serving {} configured feed(s)", config.feeds.len());

    let server = WebServer::new(&config, articles)?;
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );
    server.run().await
}
