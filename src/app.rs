/*
 * Responsibility
 * - Config 読み込み → エンドポイント表読み込み → Router 組み立て
 * - Middleware の適用 (HTTP 共通 + エンドポイント単位の RelyingParty)
 * - axum::serve() で起動
 */
use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::gateway::{self, GatewayConfig};
use crate::middleware::{self, relying_party::RelyingParty};

fn init_tracing() {
    // RUST_LOG wins; e.g. RUST_LOG=info,relying_party=debug,tower_http=debug
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    tracing::info!(
        addr = %config.addr,
        gateway_config = %config.gateway_config_path.display(),
        "starting relying party"
    );

    let gateway = GatewayConfig::load(&config.gateway_config_path)?;
    let app = build_app(&gateway, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Full application router: endpoint table behind the relying party, wrapped
/// in the HTTP-level middleware.
pub fn build_app(gateway: &GatewayConfig, config: &Config) -> Router {
    let relying_party = RelyingParty::new(&config.token_secret, config.token_leeway_seconds);
    let router = gateway::router(gateway, &relying_party);
    middleware::http::apply(router, config)
}
