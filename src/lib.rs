pub mod codec;
pub mod config;
pub mod conn;
pub mod error;
pub mod room;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils {
    pub mod jwt;
}

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Extension, Router};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};

use crate::{config::Config, state::Hub, store::CanvasStore};

const BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Full HTTP surface: canvas and signaling sockets, the `/canvas` REST
/// front, and static files for everything else.
pub fn app(cfg: Arc<Config>, hub: Hub, store: CanvasStore) -> Router {
    Router::new()
        .merge(routes::router())
        .fallback_service(ServeDir::new(&cfg.static_dir))
        .layer(Extension(cfg))
        .layer(Extension(hub))
        .layer(Extension(store))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
}
