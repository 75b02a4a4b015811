use axum::{routing::get, Router};

pub mod canvas;
pub mod webrtc;
pub mod ws;

pub fn router() -> Router {
    Router::new()
        .nest("/ws",     ws::router())
        .nest("/webrtc", webrtc::router())
        .nest("/canvas", canvas::router())
        .route("/health", get(|| async { "ok" }))
}
