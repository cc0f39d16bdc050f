// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use dashboard_embed::application::dashboard_service::DashboardService;
use dashboard_embed::application::session::SessionOptions;
use dashboard_embed::application::streaming_service::StreamingDashboardService;
use dashboard_embed::infrastructure::board_store::BoardStore;
use dashboard_embed::infrastructure::catalog_repository::CatalogRepository;
use dashboard_embed::infrastructure::config::load_app_config;
use dashboard_embed::presentation::app_state::AppState;
use dashboard_embed::presentation::router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,dashboard_embed=debug")),
        )
        .init();

    // Load configuration
    let config = load_app_config().context("failed to load config/app.toml")?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(
        CatalogRepository::load(&config.catalog.path)
            .await
            .with_context(|| format!("failed to load catalog {}", config.catalog.path.display()))?,
    );
    let store = BoardStore::new(&config.store.dir);
    let saved = store.list().context("failed to list saved boards")?;
    tracing::info!(dir = %store.dir().display(), boards = saved.len(), "board store ready");
    if config.embed.secret_key.as_deref().is_none_or(str::is_empty) {
        tracing::warn!("embed.secret_key is not set; signed embeds are disabled");
    }

    // Create services (application layer)
    let session_options = SessionOptions {
        refresh_delay: config.session.refresh_delay(),
    };
    let dashboard_service =
        DashboardService::new(repository, config.session.load_delay(), session_options);

    let state = Arc::new(AppState {
        dashboard_service,
        streaming_service: StreamingDashboardService::new(),
        board_store: store,
        embed: config.embed.clone(),
    });

    // Responses are compressed by our own builders, so no CompressionLayer here.
    let app = router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server.bind {:?}", config.server.bind))?;
    tracing::info!(%addr, "starting dashboard-embed service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
