use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use nightstage::config::AppConfig;
use nightstage::db;
use nightstage::services::backend::http::HttpBookingBackend;
use nightstage::services::gateway::kakao::KakaoPayGateway;
use nightstage::services::gateway::PaymentGatewayClient;
use nightstage::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let backend = HttpBookingBackend::new(
        config.backend_url.clone(),
        config.backend_timeout_secs,
        config.default_unit_price,
    )?;
    let gateway = KakaoPayGateway::new(config.backend_url.clone(), config.backend_timeout_secs)?;
    if let Err(e) = gateway.ensure_ready().await {
        tracing::warn!(error = %e, "payment gateway not ready at startup");
    }
    tracing::info!(backend = %config.backend_url, "using booking backend");

    let state = Arc::new(AppState::new(
        conn,
        config.clone(),
        Box::new(backend),
        Box::new(gateway),
    ));

    let app = nightstage::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
