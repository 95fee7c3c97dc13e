//! Per-endpoint bearer-token gate.
//!
//! `RelyingParty::protect` is called once per endpoint while the routing
//! table is built. Endpoints that carry a roles block in their extra config
//! get a gate in front of their handler; every other endpoint is returned
//! untouched.
//!
//! Per request: parse `Authorization` → verify signature → extract
//! `user_id`/`user_role` → match the allow-list → set `User-Id` → delegate.
//! Any failure ends the request with 401/403 before the handler runs.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::error::{AuthError, EndpointConfigError};
use crate::gateway::EndpointConfig;
use crate::services::auth::policy::NAMESPACE;
use crate::services::auth::{
    Access, EndpointAuthConfig, Identity, SharedSecret, TokenVerifier, parse_bearer,
};

/// Builds endpoint gates. Holds the verifier shared by all of them.
#[derive(Debug, Clone)]
pub struct RelyingParty {
    verifier: Arc<TokenVerifier>,
}

impl RelyingParty {
    pub fn new(secret: &SharedSecret, leeway_seconds: u64) -> Self {
        Self {
            verifier: Arc::new(TokenVerifier::new(secret, leeway_seconds)),
        }
    }

    /// Gate for `endpoint`, if it opted in with a valid roles block.
    ///
    /// - no block ⇒ `Ok(None)`
    /// - malformed block ⇒ `Err(EndpointConfigError)`
    pub fn gate_for(
        &self,
        endpoint: &EndpointConfig,
    ) -> Result<Option<EndpointGate>, EndpointConfigError> {
        let Some(raw) = endpoint.extra_config.get(NAMESPACE) else {
            return Ok(None);
        };

        let config =
            EndpointAuthConfig::from_value(raw).map_err(|source| EndpointConfigError {
                endpoint: endpoint.to_string(),
                source,
            })?;

        Ok(Some(EndpointGate {
            verifier: Arc::clone(&self.verifier),
            config,
        }))
    }

    /// Wrap `handler` with the endpoint's gate.
    ///
    /// A malformed roles block leaves the endpoint unprotected and is logged
    /// as a warning so the misconfiguration is visible to operators.
    pub fn protect<S>(&self, endpoint: &EndpointConfig, handler: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self.gate_for(endpoint) {
            Ok(Some(gate)) => {
                tracing::info!(
                    endpoint = %endpoint,
                    roles = ?gate.config.roles,
                    "relying party enabled"
                );
                handler.route_layer(middleware::from_fn_with_state(
                    Arc::new(gate),
                    relying_party_middleware,
                ))
            }
            Ok(None) => handler,
            Err(err) => {
                tracing::warn!(
                    endpoint = %endpoint,
                    error = %err,
                    "relying party config rejected; serving endpoint unprotected"
                );
                handler
            }
        }
    }
}

/// Immutable per-endpoint authorization state.
#[derive(Debug)]
pub struct EndpointGate {
    verifier: Arc<TokenVerifier>,
    config: EndpointAuthConfig,
}

impl EndpointGate {
    pub fn new(verifier: Arc<TokenVerifier>, config: EndpointAuthConfig) -> Self {
        Self { verifier, config }
    }

    pub fn config(&self) -> &EndpointAuthConfig {
        &self.config
    }

    /// Runs the whole decision for one request without touching it.
    ///
    /// The caller applies `Identity::header` before delegating.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<Identity, AuthError> {
        let token = parse_bearer(headers)?;
        let claims = self.verifier.verify(token)?;
        let identity = Identity::from_claims(&claims)?;

        match self.config.authorize(&identity.user_role) {
            Access::Permit => Ok(identity),
            Access::Deny => {
                tracing::warn!(role = %identity.user_role, "access denied");
                Err(AuthError::RoleNotPermitted)
            }
        }
    }
}

async fn relying_party_middleware(
    State(gate): State<Arc<EndpointGate>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = gate.authorize(req.headers()).inspect_err(|err| {
        if !matches!(err, AuthError::RoleNotPermitted) {
            tracing::warn!(kind = err.kind(), error = %err, "bearer token rejected");
        }
    })?;

    // Overwrites any User-Id the client sent.
    let (name, value) = identity.header();
    req.headers_mut().insert(name, value);

    Ok(next.run(req).await)
}
