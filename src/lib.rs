pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod service;
pub mod store;
pub mod upstream;

use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::auth::StaticTokenVerifier;
use crate::config::AppConfig;
use crate::service::{AppState, WardrobeServices};
use crate::store::{FilesystemBlobStore, MemoryMetadataStore, MetadataStore, PostgresStore};
use crate::upstream::HttpSegmentationClient;

// Export the public surface
pub use error::{WardrobeError, WardrobeResult};
pub use model::*;

/// Build the shared state from configuration, connecting every collaborator once
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let metadata: Arc<dyn MetadataStore> = match config.database_url() {
        Some(database_url) => {
            log::info!("Connecting to PostgreSQL...");
            let postgres_store =
                PostgresStore::new(&database_url, config.database.max_connections).await?;
            log::info!("Running database migrations...");
            postgres_store.migrate().await?;
            Arc::new(postgres_store)
        }
        None => {
            log::warn!("No database configured; wardrobe metadata is kept in memory only");
            Arc::new(MemoryMetadataStore::new())
        }
    };

    let blobs = Arc::new(FilesystemBlobStore::new(
        &config.storage.blob_root,
        &config.storage.public_base_url,
    ));
    let verifier = Arc::new(StaticTokenVerifier::from_config(&config.auth));
    if config.auth.allow_dev_tokens {
        log::warn!("Development tokens are enabled");
    }
    let segmentation = Arc::new(HttpSegmentationClient::new(&config.segmentation)?);

    Ok(WardrobeServices::new(metadata, blobs, verifier, segmentation, config).into_state())
}

/// API routes plus `/media`, which serves the filesystem blob store
pub fn build_router(state: AppState, config: &AppConfig) -> axum::Router {
    api::routes::create_router(config.body_limit())
        .nest_service("/media", ServeDir::new(&config.storage.blob_root))
        .with_state(state)
}

pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Wardrobe ingest server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
