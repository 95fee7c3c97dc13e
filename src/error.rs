/*
 * Responsibility
 * - リクエスト単位の認可エラー (AuthError) の定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - エンドポイント登録時の設定エラー (EndpointConfigError)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

/// Terminal rejection of a request by the endpoint gate.
///
/// Every variant is final for the request; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token not exists")]
    MissingCredential,
    #[error("token is malformed")]
    MalformedCredential,
    #[error("unexpected signing method: {0}")]
    UnexpectedSigningMethod(String),
    #[error("{0}")]
    TokenVerificationFailed(String),
    #[error("user id in claims not exist")]
    MissingUserId,
    #[error("user role in claims not exist")]
    MissingUserRole,
    #[error("access denied")]
    RoleNotPermitted,
}

impl AuthError {
    /// Machine-readable code placed in the `error` field of the body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential
            | Self::MalformedCredential
            | Self::UnexpectedSigningMethod(_)
            | Self::TokenVerificationFailed(_) => "invalidToken",
            Self::MissingUserId => "invalidUserId",
            Self::MissingUserRole => "invalidUserRole",
            Self::RoleNotPermitted => "accessDenied",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::RoleNotPermitted => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.kind(),
            message: self.to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}

/// Raised while registering an endpoint whose auth block cannot be parsed.
///
/// Never surfaced to clients: the endpoint is served without the gate.
#[derive(Debug, Error)]
#[error("invalid relying party config for {endpoint}: {source}")]
pub struct EndpointConfigError {
    pub endpoint: String,
    #[source]
    pub source: serde_json::Error,
}
