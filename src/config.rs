use std::{net::SocketAddr, path::PathBuf};

const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_QUEUE: usize = 256;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url:   String,
    pub jwt_secret:     String,
    pub bind_addr:      SocketAddr,
    /// Bound of every connection's outbound queue. A consumer that lets it
    /// fill up is disconnected.
    pub outbound_queue: usize,
    pub static_dir:     PathBuf,
}

impl Config {
    /// Read from the process environment (call `dotenvy::dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| get(key).filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(key));

        let bind = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND.into());
        let bind_addr = bind
            .parse()
            .map_err(|_| ConfigError::Invalid { key: "BIND_ADDR", value: bind.clone() })?;

        let outbound_queue = match get("OUTBOUND_QUEUE") {
            None => DEFAULT_QUEUE,
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Invalid { key: "OUTBOUND_QUEUE", value: v }),
            },
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr,
            outbound_queue,
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "static".into()).into(),
        })
    }
}
