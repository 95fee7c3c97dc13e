//! HTTP-level middleware (cross-cutting concerns).
//!
//! Applied once around the whole gateway router, outside of the
//! per-endpoint relying-party gates. Limits come from `Config`
//! (`BODY_LIMIT_BYTES`, `REQUEST_TIMEOUT_SECONDS`).
//!
//! Responsibility:
//! - Request-Id generation + propagation (X-Request-Id)
//! - Access logging / request tracing (TraceLayer)
//! - Body size limit
//! - Per-request timeout, answered with the gateway's JSON error body

use axum::error_handling::HandleErrorLayer;
use axum::http::{StatusCode, header::HeaderName};
use axum::{Json, Router};
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::ErrorResponse;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn apply(router: Router, config: &Config) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let layers = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(service_error))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http());

    router.layer(layers)
}

async fn service_error(err: BoxError) -> (StatusCode, Json<ErrorResponse>) {
    if err.is::<Elapsed>() {
        tracing::warn!("request timed out");
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(ErrorResponse {
                error: "requestTimeout",
                message: "request timed out".to_string(),
            }),
        )
    } else {
        tracing::error!(error = %err, "unhandled service error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "internal",
                message: "internal server error".to_string(),
            }),
        )
    }
}
