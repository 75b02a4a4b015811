//! Cursor presence and advisory collision detection.
//!
//! Collision is a box test on both axes, not a distance. It only ever
//! holds back the mover's own output; the other user is never locked.

use std::collections::HashMap;

use crate::codec::canvas::CursorMove;

/// Half-width of the collision box, in canvas units.
pub const COLLISION_RADIUS: f64 = 24.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Presence {
    pub user_id:      String,
    pub name:         String,
    pub x:            f64,
    pub y:            f64,
    pub cursor_color: String,
    pub tool:         String,
    pub drawing:      bool,
    /// Collision state last reported to this user.
    pub colliding:    bool,
}

/// What the room should do with a cursor sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOutcome {
    /// Broadcast the cursor; `collision` rides along for the UI.
    Delivered { collision: bool, flipped: bool },
    /// Mover is mid-stroke on top of someone else: send nothing out.
    Suppressed { flipped: bool },
}

impl CursorOutcome {
    /// Whether the mover's collision state changed with this sample.
    pub fn flipped(self) -> bool {
        match self {
            CursorOutcome::Delivered { flipped, .. } | CursorOutcome::Suppressed { flipped } => flipped,
        }
    }

    pub fn collision(self) -> bool {
        match self {
            CursorOutcome::Delivered { collision, .. } => collision,
            CursorOutcome::Suppressed { .. } => true,
        }
    }
}

pub fn within_box(ax: f64, ay: f64, bx: f64, by: f64) -> bool {
    (ax - bx).abs() < COLLISION_RADIUS && (ay - by).abs() < COLLISION_RADIUS
}

#[derive(Debug, Default)]
pub struct PresenceMap {
    entries: HashMap<String, Presence>,
}

impl PresenceMap {
    /// True when any cursor other than `user_id`'s sits inside the box
    /// around `(x, y)`.
    pub fn collides(&self, user_id: &str, x: f64, y: f64) -> bool {
        self.entries
            .values()
            .any(|p| p.user_id != user_id && within_box(p.x, p.y, x, y))
    }

    /// Record a cursor sample (last write wins) and decide whether it
    /// goes out. The stored position always advances, so others collide
    /// against where the mover really is even while it is held back.
    pub fn update(&mut self, m: &CursorMove) -> CursorOutcome {
        let collision = self.collides(&m.user_id, m.x, m.y);
        let entry = self
            .entries
            .entry(m.user_id.clone())
            .or_insert_with(|| Presence {
                user_id:      m.user_id.clone(),
                name:         String::new(),
                x:            m.x,
                y:            m.y,
                cursor_color: String::new(),
                tool:         String::new(),
                drawing:      false,
                colliding:    false,
            });
        let flipped = entry.colliding != collision;
        entry.name.clone_from(&m.name);
        entry.x = m.x;
        entry.y = m.y;
        entry.cursor_color.clone_from(&m.cursor_color);
        entry.tool.clone_from(&m.tool);
        entry.drawing = m.drawing;
        entry.colliding = collision;

        if m.drawing && collision {
            CursorOutcome::Suppressed { flipped }
        } else {
            CursorOutcome::Delivered { collision, flipped }
        }
    }

    pub fn get(&self, user_id: &str) -> Option<&Presence> { self.entries.get(user_id) }

    pub fn remove(&mut self, user_id: &str) -> Option<Presence> { self.entries.remove(user_id) }
}
