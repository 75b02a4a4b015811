//! Per-connection outbound queue.
//!
//! Producers never await a consumer: frames go in with `try_send`, and a
//! full or closed queue reports back so the room can evict the connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{sink::SinkExt, stream::SplitSink};
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Notify,
};
use uuid::Uuid;

pub type ConnId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Consumer is too slow; the queue bound was hit.
    Full,
    /// Writer side is gone.
    Closed,
}

/// Sending half of one connection's bounded outbound queue.
#[derive(Debug, Clone)]
pub struct Outbox {
    id:   ConnId,
    tx:   mpsc::Sender<String>,
    kill: Arc<Notify>,
}

impl Outbox {
    /// `cap` must be non-zero.
    pub fn channel(cap: usize) -> (Outbox, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(cap);
        let ob = Outbox { id: Uuid::new_v4(), tx, kill: Arc::new(Notify::new()) };
        (ob, rx)
    }

    pub fn id(&self) -> ConnId { self.id }

    pub fn push(&self, frame: String) -> Delivery {
        match self.tx.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Ask the owning socket task to shut down.
    pub fn evict(&self) { self.kill.notify_one(); }

    /// Resolves once `evict` has been called, even if it was called first.
    pub async fn evicted(&self) { self.kill.notified().await }
}

/// Drain queued frames into the socket until either side closes.
pub async fn pump(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<String>) {
    while let Some(frame) = rx.recv().await {
        if sink.send(Message::Text(frame)).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}
