//! payment-service binary

use std::sync::Arc;

use payment_service::api;
use payment_service::config::Config;
use payment_service::db::{MemoryPaymentStore, PaymentStore, PgPaymentStore};
use payment_service::reconciler::PaymentReconciler;
use payment_service::state::AppState;
use payment_service::workers;
use shared::auth::JwtService;
use shared::message::{AmqpChannel, MessageChannel};
use shared::mutation::HasuraClient;
use shared::tasks::BackgroundTasks;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    shared::logger::init_logger(&config.log_level, config.log_json, config.log_dir.as_deref())?;

    tracing::info!("Starting payment-service (env: {})", config.environment);

    let store: Arc<dyn PaymentStore> = match &config.database_url {
        Some(url) => {
            let store = PgPaymentStore::connect(url).await?;
            tracing::info!("Payment store connected, migrations applied");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, payments are kept in memory only");
            Arc::new(MemoryPaymentStore::new())
        }
    };

    let executor = Arc::new(HasuraClient::new(
        &config.hasura_endpoint,
        &config.hasura_admin_secret,
    )?);
    let channel: Arc<dyn MessageChannel> = Arc::new(AmqpChannel::new(&config.rabbitmq_url));

    let mut reconciler = PaymentReconciler::new(store.clone(), executor, config.retry);
    if let Some(queue) = &config.dead_letter_queue {
        tracing::info!(queue = %queue, "Dead-lettering failed settlements");
        reconciler = reconciler.with_dead_letter(channel.clone(), queue.clone());
    }

    let mut tasks = BackgroundTasks::new();
    workers::register(&mut tasks, channel.clone(), config.ack_mode, Arc::new(reconciler));
    tasks.log_summary();

    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET not set, /publish-order-created accepts any caller");
    }
    let state = AppState {
        jwt: JwtService::with_config(config.jwt.clone()),
        store,
        channel,
        default_currency: config.default_currency.clone(),
        webhook_secret: config.webhook_secret.clone(),
    };
    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("payment-service HTTP listening on {http_addr}");

    let shutdown = tasks.shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    tasks.shutdown().await;
    tracing::info!("payment-service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutdown signal received");
}
