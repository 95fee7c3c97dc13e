/*
 * Responsibility
 * - 環境変数の読み込み (PORT, TOKEN_SECRET, GATEWAY_CONFIG, HTTP 制限値など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::services::auth::SharedSecret;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Process-wide settings. `Debug` is safe to log: the secret is redacted.
#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub token_secret: SharedSecret,
    pub token_leeway_seconds: u64,
    pub gateway_config_path: PathBuf,

    // HTTP-level limits applied around every route
    pub body_limit_bytes: usize,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so it can be exercised
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = match lookup("PORT") {
            Some(s) => s.trim().parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => 8080,
        };
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let token_secret = lookup("TOKEN_SECRET").ok_or(ConfigError::Missing("TOKEN_SECRET"))?;
        if token_secret.is_empty() {
            return Err(ConfigError::Invalid("TOKEN_SECRET"));
        }

        let token_leeway_seconds = match lookup("TOKEN_LEEWAY_SECONDS") {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid("TOKEN_LEEWAY_SECONDS"))?,
            None => 0,
        };

        let gateway_config_path = lookup("GATEWAY_CONFIG")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("gateway.json"));

        let body_limit_bytes = match lookup("BODY_LIMIT_BYTES") {
            Some(s) => s
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("BODY_LIMIT_BYTES"))?,
            None => 1024 * 1024,
        };

        let request_timeout_seconds = match lookup("REQUEST_TIMEOUT_SECONDS") {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"))?,
            None => 30,
        };

        Ok(Self {
            addr,
            token_secret: SharedSecret::new(token_secret),
            token_leeway_seconds,
            gateway_config_path,
            body_limit_bytes,
            request_timeout: Duration::from_secs(request_timeout_seconds),
        })
    }
}
