use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey,
                   Header, Validation};
use serde::{Deserialize, Serialize};

const TTL_SECS: i64 = 86_400;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(rename = "fullName", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Who is behind a token. `name` falls back to the user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub name:    String,
}

pub fn sign(uid: &str, full_name: Option<&str>, secret: &str) -> jsonwebtoken::errors::Result<String> {
    let c = Claims { sub: uid.into(), exp: Utc::now().timestamp() + TTL_SECS, full_name: full_name.map(Into::into) };
    encode(&Header::default(), &c, &EncodingKey::from_secret(secret.as_bytes()))
}

pub fn verify(token: &str, secret: &str) -> Option<Identity> {
    let c = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()),
                             &Validation::new(Algorithm::HS256))
        .ok()?
        .claims;
    let name = c.full_name.filter(|n| !n.is_empty()).unwrap_or_else(|| c.sub.clone());
    Some(Identity { user_id: c.sub, name })
}

/// `Authorization: Bearer <token>` → identity.
pub fn bearer(headers: &HeaderMap, secret: &str) -> Option<Identity> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?;
    verify(token.trim(), secret)
}
