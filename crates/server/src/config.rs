//! Environment-driven configuration, read once at startup.

use std::path::PathBuf;

use secrecy::SecretString;

/// Fallback secret for local development only; deployments set TOKEN_SECRET.
const DEV_TOKEN_SECRET: &str = "insecure-dev-token-secret";

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    /// Shared pub/sub endpoint. When unset the instance runs with the
    /// in-process bus (single-node mode).
    pub redis_url: Option<String>,
    pub token_secret: SecretString,
}

impl Config {
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(5000);
        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("boardsync.sqlite"));
        let redis_url = std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty());
        let token_secret = SecretString::from(
            std::env::var("TOKEN_SECRET").unwrap_or_else(|_| DEV_TOKEN_SECRET.to_string()),
        );

        Self {
            host,
            port,
            database_path,
            redis_url,
            token_secret,
        }
    }
}
