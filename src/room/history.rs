//! Ordered, append-only stroke log of one room.

use crate::codec::canvas::Stroke;

#[derive(Debug, Default, Clone)]
pub struct StrokeLog {
    strokes: Vec<Stroke>,
}

impl StrokeLog {
    pub fn append(&mut self, stroke: Stroke) { self.strokes.push(stroke); }

    /// Replace the whole log. Undo, clear and restore all come through
    /// here; they only differ in the replacement they supply.
    pub fn reset(&mut self, replacement: Vec<Stroke>) { self.strokes = replacement; }

    pub fn strokes(&self) -> &[Stroke] { &self.strokes }

    pub fn len(&self) -> usize { self.strokes.len() }

    pub fn is_empty(&self) -> bool { self.strokes.is_empty() }
}
