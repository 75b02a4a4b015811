//! Inbound frame decoding and outbound frame building.
//!
//! Every text frame is parsed once at the socket boundary into a typed
//! variant; nothing downstream looks at raw JSON fields again.

pub mod canvas;
pub mod signal;

use serde_json::Value;

/// Result of decoding one inbound text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Event(T),
    /// Well-formed JSON carrying a `type` we do not know. Dropped.
    Unknown(String),
    /// Not JSON, no `type`, or missing/ill-typed required fields. Dropped.
    Malformed(String),
}

/// Parse a frame and pull out its `type` tag.
pub(crate) fn split_tag(raw: &str) -> Result<(Value, String), String> {
    let v: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let tag = v
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing type tag".to_string())?
        .to_owned();
    Ok((v, tag))
}

/// Decode `v` as `T`, folding the serde error into `Malformed`.
pub(crate) fn typed<T, U>(v: Value, wrap: impl FnOnce(T) -> U) -> Decoded<U>
where
    T: serde::de::DeserializeOwned,
{
    match serde_json::from_value::<T>(v) {
        Ok(t) => Decoded::Event(wrap(t)),
        Err(e) => Decoded::Malformed(e.to_string()),
    }
}
