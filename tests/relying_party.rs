//! HTTP-level tests for the endpoint gate.
//!
//! Tokens are minted with `jsonwebtoken::encode` and requests are driven
//! through the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::routing::get;
use axum::{Router, response::Response};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header, get_current_timestamp};
use serde_json::{Value, json};
use tower::ServiceExt;

use relying_party::app::build_app;
use relying_party::config::Config;
use relying_party::gateway::{EndpointConfig, GatewayConfig};
use relying_party::middleware::relying_party::RelyingParty;
use relying_party::services::auth::SharedSecret;

const SECRET: &str = "s3cr3t";
const NAMESPACE: &str = "github.com/relying-party/roles";

fn gateway() -> GatewayConfig {
    GatewayConfig::from_json(
        &json!({
            "endpoints": [
                {
                    "endpoint": "/articles",
                    "method": "GET",
                    "extra_config": { NAMESPACE: { "roles": ["admin", "editor"] } }
                },
                {
                    "endpoint": "/locked",
                    "extra_config": { NAMESPACE: { "roles": [] } }
                },
                { "endpoint": "/public" },
                {
                    "endpoint": "/misconfigured",
                    "extra_config": { NAMESPACE: { "roles": "admin" } }
                }
            ]
        })
        .to_string(),
    )
    .unwrap()
}

fn app() -> Router {
    let config = Config::from_lookup(|key: &str| (key == "TOKEN_SECRET").then(|| SECRET.to_string()))
        .unwrap();
    build_app(&gateway(), &config)
}

fn token(secret: &str, claims: Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

fn valid_claims(role: &str) -> Value {
    json!({
        "user_id": "u1",
        "user_role": role,
        "exp": get_current_timestamp() + 600,
    })
}

fn request(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

// -- Credential shape ---------------------------------------------------------

#[tokio::test]
async fn missing_header_is_invalid_token() {
    let (status, body) = send(app(), request("/articles", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalidToken");
    assert_eq!(body["message"], "token not exists");
}

#[tokio::test]
async fn malformed_header_is_invalid_token() {
    let good = token(SECRET, valid_claims("editor"));
    for value in [
        good.clone(),
        format!("bearer {good}"),
        format!("Basic {good}"),
        format!("Bearer {good} extra"),
    ] {
        let (status, body) = send(app(), request("/articles", Some(&value))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{value}");
        assert_eq!(body["error"], "invalidToken");
        assert_eq!(body["message"], "token is malformed");
    }
}

// -- Scenario: secret "s3cr3t", allow-list ["admin", "editor"] ----------------

#[tokio::test]
async fn editor_is_delegated_with_user_id() {
    let auth = format!("Bearer {}", token(SECRET, valid_claims("editor")));
    let (status, body) = send(app(), request("/articles", Some(&auth))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoint"], "GET /articles");
    assert_eq!(body["user_id"], "u1");
}

#[tokio::test]
async fn viewer_is_forbidden() {
    let auth = format!("Bearer {}", token(SECRET, valid_claims("viewer")));
    let (status, body) = send(app(), request("/articles", Some(&auth))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "accessDenied");
}

#[tokio::test]
async fn wrong_secret_is_unauthorized() {
    let auth = format!("Bearer {}", token("wrong", valid_claims("editor")));
    let (status, body) = send(app(), request("/articles", Some(&auth))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalidToken");
    assert!(!body["message"].as_str().unwrap().is_empty());
}

// -- Verification failures ----------------------------------------------------

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let claims = json!({
        "user_id": "u1",
        "user_role": "editor",
        "exp": get_current_timestamp() - 60,
    });
    let auth = format!("Bearer {}", token(SECRET, claims));
    let (status, body) = send(app(), request("/articles", Some(&auth))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalidToken");
}

#[tokio::test]
async fn non_hmac_algorithm_is_rejected() {
    let forged = format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(json!({ "alg": "RS256", "typ": "JWT" }).to_string()),
        URL_SAFE_NO_PAD.encode(valid_claims("admin").to_string()),
        URL_SAFE_NO_PAD.encode(b"signature"),
    );
    let auth = format!("Bearer {forged}");
    let (status, body) = send(app(), request("/articles", Some(&auth))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalidToken");
    assert_eq!(body["message"], "unexpected signing method: RS256");
}

#[tokio::test]
async fn alg_none_is_rejected_as_unexpected_signing_method() {
    let forged = format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(json!({ "alg": "none", "typ": "JWT" }).to_string()),
        URL_SAFE_NO_PAD.encode(valid_claims("admin").to_string()),
    );
    let auth = format!("Bearer {forged}");
    let (status, body) = send(app(), request("/articles", Some(&auth))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalidToken");
    assert_eq!(body["message"], "unexpected signing method: none");
}

#[tokio::test]
async fn token_issued_in_the_future_is_unauthorized() {
    let claims = json!({
        "user_id": "u1",
        "user_role": "editor",
        "iat": get_current_timestamp() + 3600,
    });
    let auth = format!("Bearer {}", token(SECRET, claims));
    let (status, body) = send(app(), request("/articles", Some(&auth))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalidToken");
    assert_eq!(body["message"], "token used before issued");
}

#[tokio::test]
async fn signed_non_object_payload_is_invalid_token() {
    let auth = format!("Bearer {}", token(SECRET, json!(["u1", "editor"])));
    let (status, body) = send(app(), request("/articles", Some(&auth))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalidToken");
}

#[tokio::test]
async fn missing_claims_have_their_own_kinds() {
    let cases = [
        (json!({ "user_role": "editor" }), "invalidUserId"),
        (json!({ "user_id": 7, "user_role": "editor" }), "invalidUserId"),
        (json!({ "user_id": "u1" }), "invalidUserRole"),
        (json!({ "user_id": "u1", "user_role": ["editor"] }), "invalidUserRole"),
    ];
    for (claims, kind) in cases {
        let auth = format!("Bearer {}", token(SECRET, claims.clone()));
        let (status, body) = send(app(), request("/articles", Some(&auth))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{claims}");
        assert_eq!(body["error"], kind, "{claims}");
    }
}

// -- Endpoint opt-in ----------------------------------------------------------

#[tokio::test]
async fn empty_allow_list_denies_every_role() {
    let auth = format!("Bearer {}", token(SECRET, valid_claims("admin")));
    let (status, body) = send(app(), request("/locked", Some(&auth))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "accessDenied");
}

#[tokio::test]
async fn endpoint_without_block_is_unprotected() {
    let (status, body) = send(app(), request("/public", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], Value::Null);
}

#[tokio::test]
async fn malformed_block_fails_open() {
    let (status, body) = send(app(), request("/misconfigured", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoint"], "GET /misconfigured");
}

#[tokio::test]
async fn health_is_never_protected() {
    let (status, body) = send(app(), request("/__health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unrouted_method_is_not_gated() {
    let req = Request::builder()
        .method("POST")
        .uri("/articles")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// -- Delegation side effects --------------------------------------------------

struct Recorder {
    calls: Arc<AtomicUsize>,
    router: Router,
}

fn recording_endpoint(roles: Value) -> Recorder {
    let endpoint: EndpointConfig = serde_json::from_value(json!({
        "endpoint": "/records",
        "method": "GET",
        "extra_config": { NAMESPACE: roles },
    }))
    .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let handler = get(move |headers: HeaderMap| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        let user_id = headers
            .get("user-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        axum::Json(json!({ "user_id": user_id }))
    });

    let relying_party = RelyingParty::new(&SharedSecret::new(SECRET), 0);
    let router = Router::new().route("/records", relying_party.protect(&endpoint, handler));
    Recorder { calls, router }
}

#[tokio::test]
async fn rejected_requests_never_reach_the_handler() {
    let recorder = recording_endpoint(json!({ "roles": ["admin"] }));

    let requests = [
        request("/records", None),
        request("/records", Some("Bearer not-a-jwt")),
        request(
            "/records",
            Some(&format!("Bearer {}", token("wrong", valid_claims("admin")))),
        ),
        request(
            "/records",
            Some(&format!("Bearer {}", token(SECRET, valid_claims("editor")))),
        ),
    ];
    for req in requests {
        let response = recorder.router.clone().oneshot(req).await.unwrap();
        assert!(response.status().is_client_error());
    }

    assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn client_supplied_user_id_is_overwritten() {
    let recorder = recording_endpoint(json!({ "roles": ["admin"] }));
    let req = Request::builder()
        .uri("/records")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token(SECRET, valid_claims("admin"))),
        )
        .header("User-Id", "spoofed")
        .body(Body::empty())
        .unwrap();

    let response = recorder.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user_id"], "u1");
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_requests_get_the_same_decision() {
    let recorder = recording_endpoint(json!({ "roles": ["admin"] }));
    let auth = format!("Bearer {}", token(SECRET, valid_claims("admin")));

    for _ in 0..5 {
        let response = recorder
            .router
            .clone()
            .oneshot(request("/records", Some(&auth)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["user_id"], "u1");
    }
    assert_eq!(recorder.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn request_id_is_propagated() {
    let response = app()
        .oneshot(request("/__health", None))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}
