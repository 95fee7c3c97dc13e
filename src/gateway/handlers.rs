/*
 * Responsibility
 * - GET /__health (疎通用, 認証なし)
 * - エンドポイントの backend スタブ (受け取った User-Id をそのまま返す)
 */
use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;

use crate::services::auth::USER_ID_HEADER;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Stands in for the proxied backend: reports which endpoint answered and the
/// identity forwarded to it.
pub async fn backend(endpoint: String, headers: HeaderMap) -> impl IntoResponse {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    (
        StatusCode::OK,
        Json(json!({ "endpoint": endpoint, "user_id": user_id })),
    )
}
