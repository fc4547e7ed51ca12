//! order-service binary

use std::sync::Arc;

use order_service::config::Config;
use order_service::state::AppState;
use order_service::api;
use shared::auth::JwtService;
use shared::message::AmqpChannel;
use shared::mutation::HasuraClient;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    shared::logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!("Starting order-service (env: {})", config.environment);

    let executor = Arc::new(HasuraClient::new(
        &config.hasura_endpoint,
        &config.hasura_admin_secret,
    )?);
    // Lazy: the broker may come up after us, publishes reconnect on demand
    let channel = Arc::new(AmqpChannel::new(&config.rabbitmq_url));

    let state = AppState::new(
        JwtService::with_config(config.jwt.clone()),
        executor,
        channel,
        &config.default_currency,
    );
    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("order-service HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("order-service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutdown signal received");
}
