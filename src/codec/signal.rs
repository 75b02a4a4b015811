//! Call-signaling channel frames. SDP and ICE payloads are carried as
//! opaque JSON and never inspected.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{split_tag, typed, Decoded};

const SIGNAL_TAGS: &[&str] = &["join", "offer", "answer", "ice-candidate", "leave"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    Offer,
    Answer,
    IceCandidate,
}

impl RelayKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayKind::Offer => "offer",
            RelayKind::Answer => "answer",
            RelayKind::IceCandidate => "ice-candidate",
        }
    }
}

/// A point-to-point handshake message addressed to one peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Relay {
    pub kind: RelayKind,
    pub target: String,
    pub user_name: Option<String>,
    pub sdp: Option<Value>,
    pub candidate: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalEvent {
    Join { user_id: String, user_name: String },
    Relay(Relay),
    Leave { user_name: Option<String> },
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Wire {
    #[serde(rename = "join", rename_all = "camelCase")]
    Join { user_name: String, user_id: String },
    #[serde(rename = "offer", rename_all = "camelCase")]
    Offer {
        target_user_id: String,
        #[serde(default)]
        user_name: Option<String>,
        sdp: Value,
    },
    #[serde(rename = "answer", rename_all = "camelCase")]
    Answer {
        target_user_id: String,
        #[serde(default)]
        user_name: Option<String>,
        sdp: Value,
    },
    #[serde(rename = "ice-candidate", rename_all = "camelCase")]
    IceCandidate { target_user_id: String, candidate: Value },
    #[serde(rename = "leave", rename_all = "camelCase")]
    Leave {
        #[serde(default)]
        user_name: Option<String>,
    },
}

impl From<Wire> for SignalEvent {
    fn from(w: Wire) -> Self {
        match w {
            Wire::Join { user_name, user_id } => SignalEvent::Join { user_id, user_name },
            Wire::Offer { target_user_id, user_name, sdp } => SignalEvent::Relay(Relay {
                kind: RelayKind::Offer,
                target: target_user_id,
                user_name,
                sdp: Some(sdp),
                candidate: None,
            }),
            Wire::Answer { target_user_id, user_name, sdp } => SignalEvent::Relay(Relay {
                kind: RelayKind::Answer,
                target: target_user_id,
                user_name,
                sdp: Some(sdp),
                candidate: None,
            }),
            Wire::IceCandidate { target_user_id, candidate } => SignalEvent::Relay(Relay {
                kind: RelayKind::IceCandidate,
                target: target_user_id,
                user_name: None,
                sdp: None,
                candidate: Some(candidate),
            }),
            Wire::Leave { user_name } => SignalEvent::Leave { user_name },
        }
    }
}

pub fn decode(raw: &str) -> Decoded<SignalEvent> {
    let (v, tag) = match split_tag(raw) {
        Ok(p) => p,
        Err(why) => return Decoded::Malformed(why),
    };
    if !SIGNAL_TAGS.contains(&tag.as_str()) {
        return Decoded::Unknown(tag);
    }
    typed::<Wire, _>(v, SignalEvent::from)
}

/* ------------ outbound ------------ */

pub fn user_joined_frame(user_id: &str, user_name: &str) -> String {
    json!({"type": "user-joined", "userId": user_id, "userName": user_name}).to_string()
}

pub fn user_left_frame(user_id: &str, user_name: &str) -> String {
    json!({"type": "user-left", "userId": user_id, "userName": user_name}).to_string()
}

pub fn participants_frame<'a>(list: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let list: Vec<Value> = list
        .map(|(id, name)| json!({"userId": id, "userName": name}))
        .collect();
    json!({"type": "participants", "participants": list}).to_string()
}

pub fn relay_frame(r: &Relay, from_user_id: &str, user_name: &str) -> String {
    let mut v = json!({
        "type": r.kind.as_str(),
        "fromUserId": from_user_id,
        "userName": user_name,
    });
    if let Some(sdp) = &r.sdp {
        v["sdp"] = sdp.clone();
    }
    if let Some(c) = &r.candidate {
        v["candidate"] = c.clone();
    }
    v.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn join_and_leave() {
        assert_eq!(
            decode(r#"{"type":"join","userName":"Ann","userId":"u1"}"#),
            Decoded::Event(SignalEvent::Join { user_id: "u1".into(), user_name: "Ann".into() })
        );
        assert_eq!(decode(r#"{"type":"leave"}"#), Decoded::Event(SignalEvent::Leave { user_name: None }));
        assert!(matches!(decode(r#"{"type":"join","userName":"Ann"}"#), Decoded::Malformed(_)));
    }

    #[test]
    fn offer_keeps_sdp_verbatim() {
        let raw = r#"{"type":"offer","targetUserId":"u2","userName":"Ann","sdp":{"type":"offer","sdp":"v=0\r\n"}}"#;
        let Decoded::Event(SignalEvent::Relay(r)) = decode(raw) else { panic!("not a relay") };
        assert_eq!(r.kind, RelayKind::Offer);
        assert_eq!(r.target, "u2");
        assert_eq!(r.sdp, Some(json!({"type": "offer", "sdp": "v=0\r\n"})));

        let out: Value = serde_json::from_str(&relay_frame(&r, "u1", "Ann")).unwrap();
        assert_eq!(out["type"], "offer");
        assert_eq!(out["fromUserId"], "u1");
        assert_eq!(out["sdp"]["sdp"], "v=0\r\n");
        assert!(out.get("candidate").is_none());
        assert!(out.get("targetUserId").is_none());
    }

    #[test]
    fn relay_requires_a_target() {
        assert!(matches!(decode(r#"{"type":"ice-candidate","candidate":{}}"#), Decoded::Malformed(_)));
        assert!(matches!(decode(r#"{"type":"answer","targetUserId":"u1"}"#), Decoded::Malformed(_)));
    }

    #[test]
    fn server_side_tags_are_unknown_inbound() {
        assert_eq!(decode(r#"{"type":"user-joined","userId":"x"}"#), Decoded::Unknown("user-joined".into()));
    }
}
