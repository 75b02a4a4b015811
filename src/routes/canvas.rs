//! routes/canvas.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    config::Config,
    error::{AppErr, AppResult},
    state::Hub,
    store::{parse_strokes, CanvasStore, Snapshot, SnapshotInfo},
    utils::jwt::{self, Identity},
};

#[derive(Deserialize)]
struct StateInput {
    room_id:    String,
    state_json: String,
}

pub fn router() -> Router {
    Router::new()
        .route("/clear/:room_id",          post(clear))
        .route("/snapshot",                post(save_snapshot))
        .route("/snapshots/:room_id",      get(list_snapshots))
        .route("/snapshot/:snapshot_id",   get(load_snapshot))
        .route("/save",                    post(save_state))
        .route("/load/:room_id",           get(load_state))
        .route("/restore/:snapshot_id",    post(restore))
}

fn caller(headers: &HeaderMap, cfg: &Config) -> AppResult<Identity> {
    jwt::bearer(headers, &cfg.jwt_secret).ok_or(AppErr::Unauthorized)
}

/// Owner-only blank canvas: persisted first, then pushed to everyone in
/// the live room. Shared by the REST route and the in-band `clear` frame.
pub(crate) async fn clear_room(store: &CanvasStore, hub: &Hub, room: &str, who: &Identity) -> AppResult<i64> {
    let id = store.clear(room, &who.user_id).await?;
    hub.reset(room, Vec::new()).await;
    info!(room, user_id = %who.user_id, snapshot_id = id, "canvas cleared");
    Ok(id)
}

/* ---------------- Clear ---------------- */
async fn clear(
    Extension(cfg): Extension<Arc<Config>>,
    Extension(hub): Extension<Hub>,
    Extension(store): Extension<CanvasStore>,
    headers: HeaderMap,
    Path(room): Path<String>,
) -> AppResult<Json<Value>> {
    let who = caller(&headers, &cfg)?;
    let id = clear_room(&store, &hub, &room, &who).await?;
    Ok(Json(json!({"message": "Canvas cleared.", "room_id": room, "snapshot_id": id})))
}

/* ---------------- Snapshots ---------------- */
async fn save_snapshot(
    Extension(cfg): Extension<Arc<Config>>,
    Extension(store): Extension<CanvasStore>,
    headers: HeaderMap,
    Json(p): Json<StateInput>,
) -> AppResult<impl IntoResponse> {
    let who = caller(&headers, &cfg)?;
    let (id, at) = store.save_snapshot(&p.room_id, &p.state_json, &who.user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"message": "Snapshot saved.", "snapshot_id": id, "created_at": at, "saved_by": who.user_id})),
    ))
}

async fn list_snapshots(
    Extension(cfg): Extension<Arc<Config>>,
    Extension(store): Extension<CanvasStore>,
    headers: HeaderMap,
    Path(room): Path<String>,
) -> AppResult<Json<Vec<SnapshotInfo>>> {
    caller(&headers, &cfg)?;
    Ok(Json(store.list_snapshots(&room).await?))
}

async fn load_snapshot(
    Extension(cfg): Extension<Arc<Config>>,
    Extension(store): Extension<CanvasStore>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Snapshot>> {
    caller(&headers, &cfg)?;
    Ok(Json(store.load_snapshot(id).await?))
}

/* ---------------- Current state ---------------- */
async fn save_state(
    Extension(cfg): Extension<Arc<Config>>,
    Extension(store): Extension<CanvasStore>,
    headers: HeaderMap,
    Json(p): Json<StateInput>,
) -> AppResult<impl IntoResponse> {
    caller(&headers, &cfg)?;
    store.save_state(&p.room_id, &p.state_json).await?;
    Ok((StatusCode::CREATED, Json(json!({"message": "Canvas state saved", "room_id": p.room_id}))))
}

async fn load_state(
    Extension(cfg): Extension<Arc<Config>>,
    Extension(store): Extension<CanvasStore>,
    headers: HeaderMap,
    Path(room): Path<String>,
) -> AppResult<Json<Value>> {
    caller(&headers, &cfg)?;
    Ok(Json(match store.load_state(&room).await? {
        Some((state_json, at)) => json!({"state_json": state_json, "room_id": room, "last_updated": at}),
        None => json!({"state_json": "[]", "room_id": room}),
    }))
}

/* ---------------- Restore ---------------- */
/// Owner-only: make a stored snapshot the room's current state and replay
/// it to everyone connected.
async fn restore(
    Extension(cfg): Extension<Arc<Config>>,
    Extension(hub): Extension<Hub>,
    Extension(store): Extension<CanvasStore>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let who = caller(&headers, &cfg)?;
    let snap = store.load_snapshot(id).await?;
    if !store.is_owner(&who.user_id, &snap.room_id).await? {
        return Err(AppErr::Forbidden("Only the room owner can restore a snapshot.".into()));
    }
    store.save_state(&snap.room_id, &snap.state_json).await?;
    let live = hub.reset(&snap.room_id, parse_strokes(&snap.room_id, &snap.state_json)).await;
    info!(room = %snap.room_id, snapshot_id = id, live, "snapshot restored");
    Ok(Json(json!({"message": "Snapshot restored.", "room_id": snap.room_id, "snapshot_id": id})))
}
