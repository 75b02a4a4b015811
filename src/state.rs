use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::{
    codec::{canvas::{ClientEvent, Stroke}, signal::Relay},
    conn::{ConnId, Outbox},
    room::{Member, RoomState, Routed},
};

/* ------------ rooms ------------ */
pub type RoomRef = Arc<Mutex<RoomState>>;
pub type RoomMap = Arc<RwLock<HashMap<String, RoomRef>>>;

/// Registry of live rooms. Each room has its own lock; the map lock is
/// only held to look a room up, create it, or retire it.
///
/// Lock order is always map, then room. Joins lock the room after the map
/// guard is gone, so they check `is_retired` and retry against a fresh
/// entry if a leave removed the room in between.
#[derive(Clone, Default)]
pub struct Hub {
    rooms: RoomMap,
}

impl Hub {
    async fn room(&self, id: &str) -> Option<RoomRef> {
        self.rooms.read().await.get(id).cloned()
    }

    async fn open(&self, id: &str) -> RoomRef {
        if let Some(room) = self.room(id).await {
            return room;
        }
        self.rooms
            .write()
            .await
            .entry(id.to_owned())
            .or_insert_with(|| {
                info!(room = id, "room opened");
                RoomRef::default()
            })
            .clone()
    }

    pub async fn is_live(&self, id: &str) -> bool {
        self.rooms.read().await.contains_key(id)
    }

    /// Whether the room already holds its canvas history. `false` for a
    /// room that does not exist or was opened by the call channel only.
    pub async fn is_seeded(&self, id: &str) -> bool {
        let Some(room) = self.room(id).await else { return false };
        let seeded = room.lock().await.is_seeded();
        seeded
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Admit a canvas connection, creating the room on first use. `seed`
    /// becomes the history only if the room has none yet.
    pub async fn join(&self, id: &str, outbox: Outbox, member: Member, mut seed: Option<Vec<Stroke>>) {
        loop {
            let room = self.open(id).await;
            let mut st = room.lock().await;
            if st.is_retired() {
                continue;
            }
            if let Some(strokes) = seed.take() {
                if st.seed(strokes) {
                    debug!(room = id, strokes = st.history.len(), "history seeded");
                }
            }
            let conn = outbox.id();
            st.seat(outbox, member);
            debug!(room = id, %conn, seats = st.seat_count(), "canvas join");
            return;
        }
    }

    pub async fn leave(&self, id: &str, conn: ConnId) {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(id).cloned() else { return };
        let mut st = room.lock().await;
        if st.unseat(conn) {
            debug!(room = id, %conn, "canvas leave");
        }
        retire_if_idle(&mut rooms, id, &mut st);
    }

    /// Route a decoded event from `from` through its room.
    pub async fn dispatch(&self, id: &str, from: ConnId, ev: ClientEvent) -> Routed {
        let Some(room) = self.room(id).await else { return Routed::Dropped };
        let routed = room.lock().await.apply(from, ev);
        routed
    }

    /// Frame for one canvas connection only. A full queue evicts it like
    /// any other delivery.
    pub async fn send_to(&self, id: &str, conn: ConnId, frame: String) -> bool {
        let Some(room) = self.room(id).await else { return false };
        let sent = room.lock().await.send_to(conn, frame);
        sent
    }

    /// Replace a live room's history and broadcast it to all members.
    /// A room nobody is connected to has nothing to update.
    pub async fn reset(&self, id: &str, shapes: Vec<Stroke>) -> bool {
        let Some(room) = self.room(id).await else {
            debug!(room = id, "reset on idle room skipped");
            return false;
        };
        room.lock().await.reset(shapes);
        true
    }

    pub async fn history(&self, id: &str) -> Vec<Stroke> {
        let Some(room) = self.room(id).await else { return Vec::new() };
        let strokes = room.lock().await.history.strokes().to_vec();
        strokes
    }

    /* ------------ call signaling ------------ */

    pub async fn call_join(&self, id: &str, user_id: &str, name: &str, outbox: Outbox) {
        loop {
            let room = self.open(id).await;
            let mut st = room.lock().await;
            if st.is_retired() {
                continue;
            }
            st.call.join(user_id, name, outbox);
            info!(room = id, user_id, participants = st.call.len(), "call join");
            return;
        }
    }

    pub async fn call_relay(&self, id: &str, from: &str, from_name: &str, r: &Relay) -> bool {
        let Some(room) = self.room(id).await else { return false };
        let sent = room.lock().await.call.relay(from, from_name, r);
        sent
    }

    pub async fn call_leave(&self, id: &str, user_id: &str, conn: ConnId, name: Option<&str>) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(id).cloned() else { return false };
        let mut st = room.lock().await;
        let left = st.call.leave(user_id, conn, name);
        if left {
            info!(room = id, user_id, participants = st.call.len(), "call leave");
        }
        retire_if_idle(&mut rooms, id, &mut st);
        left
    }
}

fn retire_if_idle(rooms: &mut HashMap<String, RoomRef>, id: &str, st: &mut RoomState) {
    if st.is_idle() {
        st.retire();
        rooms.remove(id);
        info!(room = id, "room closed");
    }
}
