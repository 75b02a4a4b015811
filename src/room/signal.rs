//! Call-signaling roster of one room.
//!
//! `join` announces the newcomer to everyone already present; offers,
//! answers and ICE candidates are unicast by target user id; `leave` or a
//! dropped socket announces `user-left` to whoever remains.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::codec::signal::{self, Relay};
use crate::conn::{ConnId, Delivery, Outbox};

#[derive(Debug)]
pub struct Participant {
    pub name: String,
    outbox:   Outbox,
}

#[derive(Debug, Default)]
pub struct CallSession {
    participants: HashMap<String, Participant>,
}

impl CallSession {
    pub fn is_empty(&self) -> bool { self.participants.is_empty() }

    pub fn len(&self) -> usize { self.participants.len() }

    pub fn contains(&self, user_id: &str) -> bool { self.participants.contains_key(user_id) }

    /// Register `user_id` on `outbox`. A second join from the same user
    /// replaces the earlier socket.
    pub fn join(&mut self, user_id: &str, name: &str, outbox: Outbox) {
        if let Some(old) = self.participants.remove(user_id) {
            if old.outbox.id() != outbox.id() {
                debug!(user_id, "call participant rejoined on a new socket");
                old.outbox.evict();
            }
        }

        self.broadcast(&signal::user_joined_frame(user_id, name));

        let roster = signal::participants_frame(
            self.participants.iter().map(|(id, p)| (id.as_str(), p.name.as_str())),
        );
        let queued = outbox.push(roster) == Delivery::Queued;
        self.participants.insert(user_id.to_owned(), Participant { name: name.to_owned(), outbox });
        if !queued {
            self.evict(vec![user_id.to_owned()]);
        }
    }

    /// Forward a handshake message to its target. `false` when the target
    /// is not in the call (already left, or never joined).
    pub fn relay(&mut self, from: &str, from_name: &str, r: &Relay) -> bool {
        let Some(target) = self.participants.get(&r.target) else {
            debug!(from, target = %r.target, kind = r.kind.as_str(), "relay target absent");
            return false;
        };
        match target.outbox.push(signal::relay_frame(r, from, from_name)) {
            Delivery::Queued => true,
            _ => {
                self.evict(vec![r.target.clone()]);
                false
            }
        }
    }

    /// Remove `user_id` if it is still registered on `conn`, telling the
    /// others. Returns whether anything was removed.
    pub fn leave(&mut self, user_id: &str, conn: ConnId, name: Option<&str>) -> bool {
        if !matches!(self.participants.get(user_id), Some(p) if p.outbox.id() == conn) {
            return false;
        }
        let Some(p) = self.participants.remove(user_id) else { return false };
        let name = name.unwrap_or(&p.name);
        self.broadcast(&signal::user_left_frame(user_id, name));
        true
    }

    fn broadcast(&mut self, frame: &str) {
        let dead: Vec<String> = self
            .participants
            .iter()
            .filter(|(_, p)| p.outbox.push(frame.to_owned()) != Delivery::Queued)
            .map(|(id, _)| id.clone())
            .collect();
        self.evict(dead);
    }

    fn evict(&mut self, mut dead: Vec<String>) {
        while !dead.is_empty() {
            let mut gone = Vec::new();
            for id in dead {
                if let Some(p) = self.participants.remove(&id) {
                    warn!(user_id = %id, "dropping unresponsive call participant");
                    p.outbox.evict();
                    gone.push((id, p.name));
                }
            }
            dead = Vec::new();
            for (id, name) in gone {
                let frame = signal::user_left_frame(&id, &name);
                for (other, p) in &self.participants {
                    if p.outbox.push(frame.clone()) != Delivery::Queued {
                        dead.push(other.clone());
                    }
                }
            }
            dead.sort();
            dead.dedup();
        }
    }
}
