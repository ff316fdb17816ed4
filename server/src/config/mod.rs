use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::SecurityPolicy;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/qtick";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_ARTIFACT_DIR: &str = "tickets";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    /// Directory ticket PDFs are written to.
    pub artifact_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unparseable values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS")
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            bind_addr: parsed(&lookup, "QTICK_BIND_ADDR").unwrap_or_else(|| {
                DEFAULT_BIND_ADDR
                    .parse()
                    .unwrap_or(SocketAddr::from(([0, 0, 0, 0], 3001)))
            }),
            artifact_dir: lookup("QTICK_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_DIR)),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}
