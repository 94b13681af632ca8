//! Dropzone bot - WhatsApp conversation engine for a skydiving center
//!
//! Receives inbound WhatsApp messages through a Twilio webhook, walks each
//! subscriber through a menu-driven state machine and sends a periodic
//! reminder to subscribers with pending reservations.

mod api;
mod config;
mod db;
mod messaging;
mod runtime;
mod shutdown;
mod state_machine;

use api::{create_router, AppState};
use config::Config;
use db::Database;
use messaging::{LogNotifier, LogSender, TwilioSender, WebhookNotifier};
use runtime::{
    AdvisorNotifier, DatabaseStore, MessageSender, PoolAllocator, ProductionEngine,
    ReminderScheduler,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dropzone_bot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let sender: Arc<dyn MessageSender> = match config.twilio.clone() {
        Some(credentials) => Arc::new(TwilioSender::new(credentials)?),
        None => {
            tracing::warn!("Twilio credentials not configured; outbound messages will only be logged. Set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_WHATSAPP_NUMBER.");
            Arc::new(LogSender)
        }
    };

    let notifier: Arc<dyn AdvisorNotifier> = match &config.advisor_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())?),
        None => {
            tracing::warn!("DROPZONE_ADVISOR_WEBHOOK_URL not set; advisor messages will only be logged");
            Arc::new(LogNotifier)
        }
    };

    if config.advisors.is_empty() {
        tracing::warn!("Advisor pool is empty; hand-off requests will be declined");
    } else {
        tracing::info!(advisors = ?config.advisors, "Advisor pool loaded");
    }

    let engine: Arc<ProductionEngine> = Arc::new(ProductionEngine::new(
        DatabaseStore::new(db),
        sender,
        PoolAllocator::new(config.advisors.clone()),
        notifier,
    ));

    // Reminder sweep runs until shutdown
    let cancel = CancellationToken::new();
    let reminders =
        ReminderScheduler::new(engine.clone(), config.reminder_interval, cancel.clone()).spawn();

    let app = create_router(AppState::new(engine));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Dropzone bot listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    shutdown::cancel_on_signal(cancel.clone());
    let server_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_cancel.cancelled().await })
        .await?;

    // Let an in-flight sweep finish
    cancel.cancel();
    if let Err(e) = reminders.await {
        tracing::error!(error = %e, "Reminder scheduler task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
