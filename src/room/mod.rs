//! State of one room and the fan-out that runs under its lock.
//!
//! Every method here is synchronous: queue pushes never wait, so holding
//! the room lock across a whole fan-out keeps per-sender ordering without
//! ever blocking on another connection's I/O.

pub mod history;
pub mod presence;
pub mod signal;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::codec::canvas::{self, ClientEvent, Stroke};
use crate::conn::{ConnId, Delivery, Outbox};
use history::StrokeLog;
use presence::{CursorOutcome, PresenceMap};
use signal::CallSession;

/// Authenticated identity behind a canvas connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: String,
    pub name:    String,
}

#[derive(Debug)]
struct Seat {
    outbox: Outbox,
    member: Member,
    /// User id this connection last claimed in a cursor frame.
    cursor: Option<String>,
}

/// What happened to a routed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Delivered,
    /// Held back by the collision guard.
    Suppressed,
    /// Sender is not (or no longer) seated in the room.
    Dropped,
}

#[derive(Debug, Default)]
pub struct RoomState {
    seats:        HashMap<ConnId, Seat>,
    pub history:  StrokeLog,
    pub presence: PresenceMap,
    pub call:     CallSession,
    /// History has been loaded from the store (or replaced since).
    seeded:       bool,
    /// Removed from the hub's map; joins must look the room up again.
    retired:      bool,
}

impl RoomState {
    /// Take the saved canvas as history unless one is already in place.
    /// A room opened by the call channel starts unseeded.
    pub fn seed(&mut self, strokes: Vec<Stroke>) -> bool {
        if self.seeded {
            return false;
        }
        self.history.reset(strokes);
        self.seeded = true;
        true
    }

    pub fn is_seeded(&self) -> bool { self.seeded }

    pub fn retire(&mut self) { self.retired = true; }

    pub fn is_retired(&self) -> bool { self.retired }

    /// No canvas connections and nobody in the call.
    pub fn is_idle(&self) -> bool { self.seats.is_empty() && self.call.is_empty() }

    pub fn seat_count(&self) -> usize { self.seats.len() }

    /* ------------ registry ------------ */

    /// Admit a connection: it gets the current history first, then
    /// everyone (itself included) gets the new member list.
    pub fn seat(&mut self, outbox: Outbox, member: Member) {
        let id = outbox.id();
        let queued = outbox.push(canvas::init_frame(self.history.strokes())) == Delivery::Queued;
        self.seats.insert(id, Seat { outbox, member, cursor: None });
        if !queued {
            self.evict(vec![id]);
            return;
        }
        let frame = self.members_frame();
        self.fan_out(&frame, None);
    }

    /// Remove a connection. `false` if it was already gone (e.g. evicted).
    pub fn unseat(&mut self, id: ConnId) -> bool {
        let Some(seat) = self.drop_seat(id) else { return false };
        self.farewell(vec![seat]);
        true
    }

    /* ------------ routing ------------ */

    pub fn apply(&mut self, from: ConnId, ev: ClientEvent) -> Routed {
        let Some(seat) = self.seats.get(&from) else { return Routed::Dropped };
        let member = seat.member.clone();
        let claimed = seat.cursor.clone();
        let cursor_key = claimed.clone().unwrap_or_else(|| member.user_id.clone());

        match ev {
            ClientEvent::Draw(stroke) => {
                if let Some((x, y)) = stroke.freehand_end() {
                    let drawing = self.presence.get(&cursor_key).is_some_and(|p| p.drawing);
                    if drawing && self.presence.collides(&cursor_key, x, y) {
                        debug!(user_id = %member.user_id, x, y, "segment suppressed by collision");
                        return Routed::Suppressed;
                    }
                }
                let frame = canvas::draw_frame(&stroke, &member.user_id, &member.name);
                self.history.append(stroke);
                self.fan_out(&frame, Some(from));
            }
            ClientEvent::Undo { shapes } => self.reset(shapes),
            ClientEvent::Cursor(m) => {
                if let Some(prev) = claimed.filter(|p| *p != m.user_id) {
                    self.presence.remove(&prev);
                }
                if let Some(seat) = self.seats.get_mut(&from) {
                    seat.cursor = Some(m.user_id.clone());
                }
                let outcome = self.presence.update(&m);
                if outcome.flipped() {
                    self.send_to(from, canvas::collision_frame(outcome.collision()));
                }
                match outcome {
                    CursorOutcome::Delivered { collision, .. } => {
                        self.fan_out(&canvas::cursor_frame(&m, collision), Some(from));
                    }
                    CursorOutcome::Suppressed { .. } => return Routed::Suppressed,
                }
            }
            ClientEvent::Chat { message } => {
                let ts = chrono::Utc::now().to_rfc3339();
                let frame = canvas::talk_frame("chat", "message", &message, &member.name, &member.user_id, &ts);
                self.fan_out(&frame, Some(from));
            }
            ClientEvent::Caption { text } => {
                let ts = chrono::Utc::now().to_rfc3339();
                let frame = canvas::talk_frame("caption", "text", &text, &member.name, &member.user_id, &ts);
                self.fan_out(&frame, Some(from));
            }
            ClientEvent::CallStarted { user_id, user_name } => {
                self.fan_out(&canvas::call_started_frame(&user_id, &user_name), Some(from));
            }
        }
        Routed::Delivered
    }

    /// Replace the history and tell every member, the requester included.
    pub fn reset(&mut self, shapes: Vec<Stroke>) {
        let frame = canvas::undo_frame(&shapes);
        self.history.reset(shapes);
        self.seeded = true;
        self.fan_out(&frame, None);
    }

    /* ------------ delivery ------------ */

    fn members_frame(&self) -> String {
        canvas::members_frame(
            self.seats
                .values()
                .map(|s| (s.member.user_id.as_str(), s.member.name.as_str())),
        )
    }

    /// Push to every seat but `except`; returns the seats that failed.
    fn deliver(&self, frame: &str, except: Option<ConnId>) -> Vec<ConnId> {
        self.seats
            .iter()
            .filter(|(id, _)| Some(**id) != except)
            .filter(|(_, s)| s.outbox.push(frame.to_owned()) != Delivery::Queued)
            .map(|(id, _)| *id)
            .collect()
    }

    fn fan_out(&mut self, frame: &str, except: Option<ConnId>) {
        let dead = self.deliver(frame, except);
        self.evict(dead);
    }

    /// Push to one seat, evicting it if its queue refuses the frame.
    /// `false` when the frame did not go out.
    pub fn send_to(&mut self, id: ConnId, frame: String) -> bool {
        let Some(seat) = self.seats.get(&id) else { return false };
        if seat.outbox.push(frame) == Delivery::Queued {
            return true;
        }
        self.evict(vec![id]);
        false
    }

    fn drop_seat(&mut self, id: ConnId) -> Option<Seat> {
        let seat = self.seats.remove(&id)?;
        if let Some(key) = &seat.cursor {
            let shared = self.seats.values().any(|s| s.cursor.as_ref() == Some(key));
            if !shared {
                self.presence.remove(key);
            }
        }
        Some(seat)
    }

    /// Tell the remaining members who went away.
    fn farewell(&mut self, gone: Vec<Seat>) {
        let mut frames: Vec<String> = gone
            .iter()
            .filter_map(|s| s.cursor.as_deref())
            .map(canvas::cursor_left_frame)
            .collect();
        frames.push(self.members_frame());
        let dead: Vec<ConnId> = frames.iter().flat_map(|f| self.deliver(f, None)).collect();
        self.evict(dead);
    }

    /// Drop connections whose queue is full or closed and close their
    /// sockets. Announcing them can fail further seats, which are
    /// evicted in turn.
    fn evict(&mut self, dead: Vec<ConnId>) {
        let gone: Vec<Seat> = dead.into_iter().filter_map(|id| self.drop_seat(id)).collect();
        if gone.is_empty() {
            return;
        }
        for s in &gone {
            warn!(conn = %s.outbox.id(), user_id = %s.member.user_id, "evicting slow or closed connection");
            s.outbox.evict();
        }
        self.farewell(gone);
    }
}
