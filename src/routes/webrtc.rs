use std::sync::Arc;

use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, Extension, Path, Query},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::stream::StreamExt;
use tracing::{debug, info, warn};

use crate::{
    codec::{signal::{self, SignalEvent}, Decoded},
    config::Config,
    conn::{self, Outbox},
    error::{AppErr, AppResult},
    routes::ws::WsQuery,
    state::Hub,
    utils::jwt::{self, Identity},
};

pub fn router() -> Router {
    Router::new().route("/:room_id", get(signal_handler))
}

async fn signal_handler(
    ws: WebSocketUpgrade,
    Path(room): Path<String>,
    Query(q): Query<WsQuery>,
    Extension(cfg): Extension<Arc<Config>>,
    Extension(hub): Extension<Hub>,
) -> AppResult<impl IntoResponse> {
    let who = jwt::verify(&q.token, &cfg.jwt_secret).ok_or(AppErr::Unauthorized)?;
    let cap = cfg.outbound_queue;
    Ok(ws.on_upgrade(move |s| signal_ws(s, who, room, hub, cap)))
}

/* ---------------- per connection ---------------- */
// Until `join` the socket only listens; relays it sends go out under the
// token's user id.
async fn signal_ws(sock: WebSocket, who: Identity, room: String, hub: Hub, cap: usize) {
    let (sink, mut stream) = sock.split();
    let (outbox, rx) = Outbox::channel(cap);
    let writer = tokio::spawn(conn::pump(sink, rx));

    let mut me = who;
    let mut joined = false;

    loop {
        let raw = tokio::select! {
            _ = outbox.evicted() => {
                warn!(%room, user_id = %me.user_id, "signaling connection evicted");
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(raw))) => raw,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    debug!(%room, error = %e, "socket error");
                    break;
                }
            },
        };

        match signal::decode(&raw) {
            Decoded::Event(SignalEvent::Join { user_id, user_name }) => {
                if joined && user_id != me.user_id {
                    hub.call_leave(&room, &me.user_id, outbox.id(), None).await;
                }
                me = Identity { user_id, name: user_name };
                hub.call_join(&room, &me.user_id, &me.name, outbox.clone()).await;
                joined = true;
            }
            Decoded::Event(SignalEvent::Relay(r)) => {
                let name = r.user_name.clone().unwrap_or_else(|| me.name.clone());
                hub.call_relay(&room, &me.user_id, &name, &r).await;
            }
            Decoded::Event(SignalEvent::Leave { user_name }) => {
                if joined {
                    hub.call_leave(&room, &me.user_id, outbox.id(), user_name.as_deref()).await;
                    joined = false;
                }
                break;
            }
            Decoded::Unknown(tag) => debug!(%room, %tag, "unknown signaling type dropped"),
            Decoded::Malformed(why) => debug!(%room, %why, "malformed signaling frame dropped"),
        }
    }

    if joined {
        hub.call_leave(&room, &me.user_id, outbox.id(), None).await;
    }
    writer.abort();
    info!(%room, user_id = %me.user_id, "signaling disconnected");
}
