//! Canvas channel frames: strokes, cursors, chat, captions, call notices.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{split_tag, typed, Decoded};

const STROKE_TAGS: &[&str] = &["brush", "draw", "eraser", "rectangle", "ellipse", "text"];
const CONTROL_TAGS: &[&str] = &[
    "undo",
    "clear",
    "cursor",
    "chat",
    "caption",
    "video_call_started",
];

/* ------------ strokes ------------ */

/// Line segment or bounding box of a shape, in canvas units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub from_x: f64,
    pub from_y: f64,
    pub to_x: f64,
    pub to_y: f64,
    pub color: String,
    pub thickness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMark {
    pub x: f64,
    pub y: f64,
    pub value: String,
    pub color: String,
    pub font_size: f64,
}

/// One immutable drawing operation as it appears in a room's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Stroke {
    #[serde(alias = "draw")]
    Brush(Segment),
    Eraser(Segment),
    Rectangle(Segment),
    Ellipse(Segment),
    Text(TextMark),
}

impl Stroke {
    /// End point of a freehand segment. Shapes and text have none: they
    /// are emitted once on release, not sampled while dragging.
    pub fn freehand_end(&self) -> Option<(f64, f64)> {
        match self {
            Stroke::Brush(s) | Stroke::Eraser(s) => Some((s.to_x, s.to_y)),
            _ => None,
        }
    }
}

/* ------------ control frames ------------ */

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMove {
    pub user_id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub cursor_color: String,
    pub tool: String,
    /// Set by clients while the pointer is down on a freehand tool.
    #[serde(default)]
    pub drawing: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
enum Control {
    #[serde(rename = "undo")]
    Undo {
        #[serde(default)]
        shapes: Vec<Stroke>,
    },
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "cursor")]
    Cursor(CursorMove),
    #[serde(rename = "chat")]
    Chat { message: String },
    #[serde(rename = "caption")]
    Caption { text: String },
    #[serde(rename = "video_call_started", rename_all = "camelCase")]
    CallStarted { user_id: String, user_name: String },
}

/// Events the room hub routes without further checks.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Draw(Stroke),
    Undo { shapes: Vec<Stroke> },
    Cursor(CursorMove),
    Chat { message: String },
    Caption { text: String },
    CallStarted { user_id: String, user_name: String },
}

/// A decoded canvas frame. `Clear` is kept apart because it must pass
/// the owner check before it is allowed anywhere near the history.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasFrame {
    Event(ClientEvent),
    Clear,
}

pub fn decode(raw: &str) -> Decoded<CanvasFrame> {
    let (v, tag) = match split_tag(raw) {
        Ok(p) => p,
        Err(why) => return Decoded::Malformed(why),
    };
    if STROKE_TAGS.contains(&tag.as_str()) {
        return typed(v, |s| CanvasFrame::Event(ClientEvent::Draw(s)));
    }
    if !CONTROL_TAGS.contains(&tag.as_str()) {
        return Decoded::Unknown(tag);
    }
    typed(v, |c: Control| match c {
        Control::Undo { shapes } => CanvasFrame::Event(ClientEvent::Undo { shapes }),
        Control::Clear => CanvasFrame::Clear,
        Control::Cursor(m) => CanvasFrame::Event(ClientEvent::Cursor(m)),
        Control::Chat { message } => CanvasFrame::Event(ClientEvent::Chat { message }),
        Control::Caption { text } => CanvasFrame::Event(ClientEvent::Caption { text }),
        Control::CallStarted { user_id, user_name } => {
            CanvasFrame::Event(ClientEvent::CallStarted { user_id, user_name })
        }
    })
}

/* ------------ outbound ------------ */

pub fn draw_frame(stroke: &Stroke, sender: &str, sender_name: &str) -> String {
    let mut v = json!(stroke);
    v["sender"] = json!(sender);
    v["sender_name"] = json!(sender_name);
    v.to_string()
}

pub fn undo_frame(shapes: &[Stroke]) -> String {
    json!({"type": "undo", "shapes": shapes}).to_string()
}

pub fn init_frame(shapes: &[Stroke]) -> String {
    json!({"type": "init", "shapes": shapes}).to_string()
}

pub fn cursor_frame(m: &CursorMove, collision: bool) -> String {
    json!({
        "type": "cursor",
        "userId": m.user_id,
        "name": m.name,
        "x": m.x,
        "y": m.y,
        "cursorColor": m.cursor_color,
        "tool": m.tool,
        "collision": collision,
    })
    .to_string()
}

pub fn cursor_left_frame(user_id: &str) -> String {
    json!({"type": "cursor_left", "userId": user_id}).to_string()
}

pub fn collision_frame(active: bool) -> String {
    json!({"type": "collision", "active": active}).to_string()
}

/// `chat` and `caption` share one envelope; only the body key differs.
pub fn talk_frame(kind: &str, body_key: &str, body: &str, user: &str, user_id: &str, ts: &str) -> String {
    json!({
        "type": kind,
        "data": {"user": user, "user_id": user_id, body_key: body, "timestamp": ts},
    })
    .to_string()
}

pub fn call_started_frame(user_id: &str, user_name: &str) -> String {
    json!({"type": "video_call_started", "userId": user_id, "userName": user_name}).to_string()
}

pub fn members_frame<'a>(members: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let list: Vec<Value> = members
        .map(|(id, name)| json!({"user_id": id, "full_name": name}))
        .collect();
    json!({"type": "room_members_update", "members": list}).to_string()
}

pub fn denied_frame(action: &str, reason: &str) -> String {
    json!({"type": "denied", "action": action, "reason": reason}).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn seg(fx: f64, fy: f64, tx: f64, ty: f64) -> Segment {
        Segment { from_x: fx, from_y: fy, to_x: tx, to_y: ty, color: "#111".into(), thickness: 4.0 }
    }

    #[test]
    fn decodes_every_stroke_kind() {
        let brush = r##"{"type":"brush","fromX":1,"fromY":2,"toX":3,"toY":4,"color":"#111","thickness":4}"##;
        assert_eq!(
            decode(brush),
            Decoded::Event(CanvasFrame::Event(ClientEvent::Draw(Stroke::Brush(seg(1.0, 2.0, 3.0, 4.0)))))
        );

        let legacy = brush.replace("\"brush\"", "\"draw\"");
        assert!(matches!(
            decode(&legacy),
            Decoded::Event(CanvasFrame::Event(ClientEvent::Draw(Stroke::Brush(_))))
        ));

        let ellipse = r##"{"type":"ellipse","fromX":0,"fromY":0,"toX":50,"toY":20,"color":"red","thickness":2}"##;
        assert!(matches!(
            decode(ellipse),
            Decoded::Event(CanvasFrame::Event(ClientEvent::Draw(Stroke::Ellipse(_))))
        ));

        let text = r#"{"type":"text","x":10,"y":20,"value":"hi","color":"blue","fontSize":20}"#;
        match decode(text) {
            Decoded::Event(CanvasFrame::Event(ClientEvent::Draw(Stroke::Text(t)))) => {
                assert_eq!(t.value, "hi");
                assert_eq!(t.font_size, 20.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_fields_are_malformed() {
        assert!(matches!(decode(r#"{"type":"brush","fromX":1}"#), Decoded::Malformed(_)));
        assert!(matches!(decode(r#"{"type":"text","x":1,"y":2,"color":"red"}"#), Decoded::Malformed(_)));
        assert!(matches!(decode(r#"{"type":"chat"}"#), Decoded::Malformed(_)));
        assert!(matches!(decode("not json at all"), Decoded::Malformed(_)));
        assert!(matches!(decode(r#"{"message":"no tag"}"#), Decoded::Malformed(_)));
    }

    #[test]
    fn unknown_tags_are_reported_not_failed() {
        assert_eq!(decode(r#"{"type":"laser_pointer","x":1}"#), Decoded::Unknown("laser_pointer".into()));
    }

    #[test]
    fn undo_without_shapes_means_empty_canvas() {
        assert_eq!(
            decode(r#"{"type":"undo"}"#),
            Decoded::Event(CanvasFrame::Event(ClientEvent::Undo { shapes: vec![] }))
        );
        let with = r##"{"type":"undo","shapes":[{"type":"eraser","fromX":1,"fromY":1,"toX":2,"toY":2,"color":"#fff","thickness":8,"sender":"a@x"}]}"##;
        match decode(with) {
            Decoded::Event(CanvasFrame::Event(ClientEvent::Undo { shapes })) => {
                assert_eq!(shapes.len(), 1);
                assert!(matches!(shapes[0], Stroke::Eraser(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clear_and_cursor() {
        assert_eq!(decode(r#"{"type":"clear"}"#), Decoded::Event(CanvasFrame::Clear));
        let c = r##"{"type":"cursor","userId":"u1","name":"Ann","x":5,"y":6,"cursorColor":"#0f0","tool":"brush"}"##;
        match decode(c) {
            Decoded::Event(CanvasFrame::Event(ClientEvent::Cursor(m))) => {
                assert_eq!(m.user_id, "u1");
                assert!(!m.drawing);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn draw_frame_tags_the_sender() {
        let s = Stroke::Rectangle(seg(0.0, 0.0, 10.0, 10.0));
        let v: Value = serde_json::from_str(&draw_frame(&s, "u1", "Ann")).unwrap();
        assert_eq!(v["type"], "rectangle");
        assert_eq!(v["sender"], "u1");
        assert_eq!(v["sender_name"], "Ann");
        let back: Stroke = serde_json::from_value(v).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn freehand_end_only_for_brush_and_eraser() {
        assert_eq!(Stroke::Eraser(seg(0.0, 0.0, 7.0, 9.0)).freehand_end(), Some((7.0, 9.0)));
        assert_eq!(Stroke::Ellipse(seg(0.0, 0.0, 7.0, 9.0)).freehand_end(), None);
    }
}
