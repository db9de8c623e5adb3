use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use trellis_common::storage::ObjectStore;
use trellis_common::storage::filesystem::FilesystemObjectStore;
use trellis_server::config::AppConfig;
use trellis_server::state::AppState;
use trellis_server::{build_router, database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    info!("Database connected");

    let objects: Arc<dyn ObjectStore> = match config.storage.backend.as_str() {
        "filesystem" => Arc::new(
            FilesystemObjectStore::new(PathBuf::from(&config.storage.root))
                .await
                .context("Failed to initialize filesystem object store")?,
        ),
        #[cfg(feature = "object-storage")]
        "s3" => Arc::new(
            trellis_common::storage::s3::S3ObjectStore::from_config(&config.storage)
                .context("Failed to initialize S3 object store")?,
        ),
        other => anyhow::bail!("Unknown storage backend: {other}"),
    };
    info!(backend = %config.storage.backend, "Object storage ready");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        objects,
        config: Arc::new(config),
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
