#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use canvas_hub::{config::Config, state::Hub, store::CanvasStore, utils::jwt};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const SECRET: &str = "integration-secret";
pub const OWNER: &str = "owner@x";

pub struct Server {
    pub addr:  SocketAddr,
    pub store: CanvasStore,
}

impl Server {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

/// Serve the full app on an ephemeral port. Room `r1` exists and is
/// owned by `OWNER`.
pub async fn spawn_server() -> Server {
    let store = CanvasStore::open("sqlite::memory:").await.unwrap();
    sqlx::query("INSERT INTO rooms (id, owner_id) VALUES ('r1', ?)")
        .bind(OWNER)
        .execute(store.pool())
        .await
        .unwrap();
    let cfg = Arc::new(Config {
        database_url: "sqlite::memory:".into(),
        jwt_secret: SECRET.into(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        outbound_queue: 64,
        static_dir: "static".into(),
    });
    let app = canvas_hub::app(cfg, Hub::default(), store.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app.into_make_service()).await.unwrap() });
    Server { addr, store }
}

pub fn token(user: &str, name: &str) -> String {
    jwt::sign(user, Some(name), SECRET).unwrap()
}

pub async fn connect(addr: SocketAddr, path: &str, user: &str, name: &str) -> Client {
    let url = format!("ws://{addr}{path}?token={}", token(user, name));
    connect_async(url).await.unwrap().0
}

pub async fn send(c: &mut Client, v: Value) {
    c.send(Message::Text(v.to_string())).await.unwrap();
}

pub async fn send_raw(c: &mut Client, raw: &str) {
    c.send(Message::Text(raw.to_owned())).await.unwrap();
}

/// Next text frame as JSON, failing the test after two seconds.
pub async fn recv(c: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), c.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap();
        if let Message::Text(t) = msg {
            return serde_json::from_str(&t).unwrap();
        }
    }
}

/// Skip frames until one of type `ty` arrives.
pub async fn recv_type(c: &mut Client, ty: &str) -> Value {
    loop {
        let v = recv(c).await;
        if v["type"] == ty {
            return v;
        }
    }
}

pub async fn silent(c: &mut Client) -> bool {
    tokio::time::timeout(Duration::from_millis(200), c.next()).await.is_err()
}

pub fn brush(x: f64) -> Value {
    json!({"type": "brush", "fromX": x, "fromY": 10.0, "toX": x + 5.0, "toY": 10.0, "color": "#111", "thickness": 2.0})
}
