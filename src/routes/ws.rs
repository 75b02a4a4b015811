use std::sync::Arc;

use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, Extension, Path, Query},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::stream::StreamExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    codec::{canvas::{self, CanvasFrame}, Decoded},
    config::Config,
    conn::{self, Outbox},
    error::{AppErr, AppResult},
    room::Member,
    routes::canvas::clear_room,
    state::Hub,
    store::CanvasStore,
    utils::jwt::{self, Identity},
};

/// A missing token decodes as empty and fails verification like a bad one.
#[derive(Deserialize)]
pub(crate) struct WsQuery {
    #[serde(default)]
    pub token: String,
}

pub fn router() -> Router {
    Router::new().route("/:room_id", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    Query(q): Query<WsQuery>,
    Extension(cfg): Extension<Arc<Config>>,
    Extension(hub): Extension<Hub>,
    Extension(store): Extension<CanvasStore>,
) -> AppResult<impl IntoResponse> {
    let who = jwt::verify(&q.token, &cfg.jwt_secret).ok_or(AppErr::Unauthorized)?;
    let cap = cfg.outbound_queue;
    Ok(ws.on_upgrade(move |s| user_ws(s, who, room, hub, store, cap)))
}

/* ---------------- per connection ---------------- */
async fn user_ws(sock: WebSocket, who: Identity, room: String, hub: Hub, store: CanvasStore, cap: usize) {
    let (sink, mut stream) = sock.split();
    let (outbox, rx) = Outbox::channel(cap);
    let writer = tokio::spawn(conn::pump(sink, rx));

    /* enter: a room without canvas history starts from the last saved canvas */
    let seed = if hub.is_seeded(&room).await {
        None
    } else {
        Some(store.load_strokes(&room).await.unwrap_or_else(|e| {
            warn!(%room, error = %e, "could not load saved canvas; starting blank");
            Vec::new()
        }))
    };
    let member = Member { user_id: who.user_id.clone(), name: who.name.clone() };
    hub.join(&room, outbox.clone(), member, seed).await;
    info!(%room, user_id = %who.user_id, conn = %outbox.id(), "canvas connected");

    loop {
        tokio::select! {
            _ = outbox.evicted() => {
                warn!(%room, user_id = %who.user_id, "connection evicted");
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(raw))) => on_text(&raw, &who, &room, &outbox, &hub, &store).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%room, error = %e, "socket error");
                    break;
                }
            },
        }
    }

    /* leave */
    hub.leave(&room, outbox.id()).await;
    writer.abort();
    info!(%room, user_id = %who.user_id, "canvas disconnected");
}

async fn on_text(raw: &str, who: &Identity, room: &str, outbox: &Outbox, hub: &Hub, store: &CanvasStore) {
    match canvas::decode(raw) {
        Decoded::Event(CanvasFrame::Event(ev)) => {
            let routed = hub.dispatch(room, outbox.id(), ev).await;
            tracing::trace!(room, ?routed, "routed");
        }
        Decoded::Event(CanvasFrame::Clear) => {
            if let Err(e) = clear_room(store, hub, room, who).await {
                debug!(room, user_id = %who.user_id, error = %e, "clear denied");
                let reason = match e {
                    AppErr::Forbidden(msg) | AppErr::NotFound(msg) => msg,
                    _ => "clear is unavailable right now".into(),
                };
                hub.send_to(room, outbox.id(), canvas::denied_frame("clear", &reason)).await;
            }
        }
        Decoded::Unknown(tag) => debug!(room, %tag, "unknown frame type dropped"),
        Decoded::Malformed(why) => debug!(room, %why, "malformed frame dropped"),
    }
}
