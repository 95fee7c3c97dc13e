/*
 * Responsibility
 * - エンドポイント表 (gateway.json) の読み込みとバリデーション
 * - 各エンドポイントの Router 組み立て (RelyingParty::protect を通す)
 */
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use axum::{
    Router,
    http::{HeaderMap, Method},
    routing::{MethodFilter, MethodRouter, get, on},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::middleware::relying_party::RelyingParty;

mod handlers;

pub const HEALTH_PATH: &str = "/__health";

#[derive(Debug, Error)]
pub enum GatewayConfigError {
    #[error("failed to read gateway config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse gateway config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("endpoint path must start with '/': {0}")]
    InvalidPath(String),
    #[error("unsupported method {method} for {endpoint}")]
    InvalidMethod { method: String, endpoint: String },
    #[error("duplicate endpoint: {0}")]
    Duplicate(String),
}

/// One routable endpoint and its extra configuration blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub endpoint: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Namespaced settings for middleware. Unknown namespaces are ignored.
    #[serde(default)]
    pub extra_config: Map<String, Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl fmt::Display for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.endpoint)
    }
}

impl EndpointConfig {
    fn method_filter(&self) -> Result<MethodFilter, GatewayConfigError> {
        let invalid = || GatewayConfigError::InvalidMethod {
            method: self.method.clone(),
            endpoint: self.endpoint.clone(),
        };
        let method = Method::from_bytes(self.method.as_bytes()).map_err(|_| invalid())?;
        MethodFilter::try_from(method).map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub endpoints: Vec<EndpointConfig>,
}

impl GatewayConfig {
    pub fn load(path: &Path) -> Result<Self, GatewayConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| GatewayConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, GatewayConfigError> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<(), GatewayConfigError> {
        let mut seen = HashSet::new();
        for endpoint in &mut self.endpoints {
            endpoint.method = endpoint.method.to_ascii_uppercase();
            if !is_routable_path(&endpoint.endpoint) {
                return Err(GatewayConfigError::InvalidPath(endpoint.endpoint.clone()));
            }
            endpoint.method_filter()?;
            if !seen.insert((endpoint.method.clone(), endpoint.endpoint.clone())) {
                return Err(GatewayConfigError::Duplicate(endpoint.to_string()));
            }
        }
        Ok(())
    }
}

// Static paths only; capture syntax would make the router panic at startup.
fn is_routable_path(path: &str) -> bool {
    path.starts_with('/')
        && path != HEALTH_PATH
        && !path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.contains(['{', '}', '*']))
}

/// Builds the routing table: one route per endpoint, each passed through the
/// relying party, plus the unprotected health check.
pub fn router(config: &GatewayConfig, relying_party: &RelyingParty) -> Router {
    let mut router = Router::new().route(HEALTH_PATH, get(handlers::health));

    for endpoint in &config.endpoints {
        let handler = match base_handler(endpoint) {
            Ok(handler) => handler,
            Err(err) => {
                // validate() already rejects these; skip rather than panic.
                tracing::error!(error = %err, "skipping endpoint");
                continue;
            }
        };
        router = router.route(&endpoint.endpoint, relying_party.protect(endpoint, handler));
    }

    router
}

fn base_handler(endpoint: &EndpointConfig) -> Result<MethodRouter, GatewayConfigError> {
    let filter = endpoint.method_filter()?;
    let name = endpoint.to_string();
    Ok(on(filter, move |headers: HeaderMap| handlers::backend(name.clone(), headers)))
}
