use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::api::handlers;
use crate::service::AppState;

pub fn create_router(body_limit: usize) -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Segmentation and ingestion
        .route("/wardrobe/parse", post(handlers::parse_photo))
        .route("/wardrobe/confirm", post(handlers::confirm_items))
        .route("/wardrobe/upload", post(handlers::upload_photo))
        // Owner's wardrobe
        .route("/wardrobe/items", get(handlers::list_items))
        .route(
            "/wardrobe/items/:id",
            get(handlers::get_item).delete(handlers::delete_item),
        )
        .route("/wardrobe/orphans", get(handlers::list_orphans))
        .layer(DefaultBodyLimit::max(body_limit))
}
