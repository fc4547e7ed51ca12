//! inventory-service binary

use std::sync::Arc;

use inventory_service::api;
use inventory_service::config::Config;
use inventory_service::reconciler::StockReconciler;
use inventory_service::state::AppState;
use inventory_service::workers;
use shared::message::{AmqpChannel, MessageChannel};
use shared::mutation::HasuraClient;
use shared::tasks::BackgroundTasks;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    shared::logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!("Starting inventory-service (env: {})", config.environment);

    let executor = Arc::new(HasuraClient::new(
        &config.hasura_endpoint,
        &config.hasura_admin_secret,
    )?);
    let channel: Arc<dyn MessageChannel> = Arc::new(AmqpChannel::new(&config.rabbitmq_url));

    let mut reconciler = StockReconciler::new(executor, config.retry);
    if let Some(queue) = &config.dead_letter_queue {
        tracing::info!(queue = %queue, "Dead-lettering exhausted stock items");
        reconciler = reconciler.with_dead_letter(channel.clone(), queue.clone());
    }
    let reconciler = Arc::new(reconciler);

    let mut tasks = BackgroundTasks::new();
    workers::register(
        &mut tasks,
        channel,
        config.ack_mode,
        reconciler.clone(),
        config.ledger_ttl,
    );
    tasks.log_summary();

    let app = api::create_router(AppState::new(reconciler));
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("inventory-service HTTP listening on {http_addr}");

    let shutdown = tasks.shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    tasks.shutdown().await;
    tracing::info!("inventory-service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutdown signal received");
}
