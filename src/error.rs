use axum::{http::StatusCode, response::IntoResponse};
use std::fmt::Display;

pub type AppResult<T> = Result<T, AppErr>;

#[derive(thiserror::Error, Debug)]
pub enum AppErr {
    #[error("Bad request: {0}")]
    Bad(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("DB: {0}")]
    Db(#[from] sqlx::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntoResponse for AppErr {
    fn into_response(self) -> axum::response::Response {
        let (code, body) = match self {
            AppErr::Bad(msg)       => (StatusCode::BAD_REQUEST, msg),
            AppErr::Json(e)        => (StatusCode::BAD_REQUEST, e.to_string()),
            AppErr::Unauthorized   => (StatusCode::UNAUTHORIZED, "authentication failed".into()),
            AppErr::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppErr::NotFound(msg)  => (StatusCode::NOT_FOUND, msg),
            other                  => {
                tracing::error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        };
        (code, body).into_response()
    }
}

/* ── helper: turn any displayable error into Bad ── */
pub fn bad<E: Display>(e: E) -> AppErr { AppErr::Bad(e.to_string()) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let code = |e: AppErr| e.into_response().status();
        assert_eq!(code(bad("nope")), StatusCode::BAD_REQUEST);
        assert_eq!(code(AppErr::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(code(AppErr::Forbidden("owner only".into())), StatusCode::FORBIDDEN);
        assert_eq!(code(AppErr::NotFound("room".into())), StatusCode::NOT_FOUND);
        assert_eq!(code(AppErr::Db(sqlx::Error::RowNotFound)), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
