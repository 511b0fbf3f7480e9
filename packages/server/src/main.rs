use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{Level, info};

use assetvault::config::AppConfig;
use assetvault::repository::DbAssetRepository;
use assetvault::state::AppState;
use storage::LocalFileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = assetvault::database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready");

    let files = LocalFileStore::new(&config.storage.root, config.storage.max_file_size)
        .await
        .context("Failed to open file store")?;
    info!(root = %files.root().display(), "File store ready");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        assets: Arc::new(DbAssetRepository::new(db)),
        files: Arc::new(files),
        config,
    };
    let app = assetvault::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
