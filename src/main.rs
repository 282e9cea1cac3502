//! Car listing bot
//!
//! Walks a Telegram user through describing a car for sale (type, color,
//! optional mileage, optional photo) and replies with a summary.

mod config;
mod dialog;
mod gateway;
mod runtime;

use config::BotConfig;
use dialog::EventKind;
use futures::StreamExt;
use gateway::{Inbound, LoggingGateway, TelegramGateway};
use runtime::{DialogError, DialogManager, InMemorySessionStore, Outcome};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pause after a failed poll before asking again
const POLL_BACKOFF: Duration = Duration::from_secs(1);

/// How long queued dialog steps may keep running after Ctrl-C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

type Manager = DialogManager<LoggingGateway<TelegramGateway>, InMemorySessionStore>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "car_listing_bot=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = BotConfig::from_env()?;
    tracing::info!(
        api_url = %config.api_url,
        poll_timeout_secs = config.poll_timeout.as_secs(),
        queue_capacity = config.queue_capacity,
        "Starting car listing bot"
    );

    let telegram = Arc::new(TelegramGateway::new(&config)?);
    let gateway = Arc::new(LoggingGateway::new(telegram.clone()));
    let store = Arc::new(InMemorySessionStore::new());
    let manager = Arc::new(DialogManager::new(gateway, store, config.dialog_config()));

    let username = telegram.username().await?;
    tracing::info!(%username, "Authenticated with Telegram");

    let updates = telegram.inbound(username);
    futures::pin_mut!(updates);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
            next = updates.next() => match next {
                Some(Ok(inbound)) => dispatch(&manager, inbound).await,
                Some(Err(e)) => {
                    tracing::warn!(kind = ?e.kind, error = %e, "Polling for updates failed");
                    let backoff = if e.kind.is_transient() { POLL_BACKOFF } else { POLL_BACKOFF * 5 };
                    tokio::time::sleep(backoff).await;
                }
                None => break,
            },
        }
    }

    // Polling has stopped; let each conversation finish what it already queued
    let conversations = manager.runtime_count().await;
    let drained = manager.shutdown(SHUTDOWN_GRACE).await;
    tracing::info!(
        conversations,
        drained,
        open_sessions = manager.store().len(),
        "Car listing bot stopped"
    );
    Ok(())
}

/// Queue an inbound event and log its outcome without holding up polling
async fn dispatch(manager: &Arc<Manager>, inbound: Inbound) {
    let Inbound {
        conversation_id,
        event,
    } = inbound;
    let kind = event.kind();

    let reply = match manager.submit(&conversation_id, event).await {
        Ok(reply) => reply,
        Err(DialogError::Busy(_)) => {
            tracing::warn!(conv_id = %conversation_id, ?kind, "Conversation busy, dropping event");
            return;
        }
        Err(e) => {
            tracing::error!(conv_id = %conversation_id, error = %e, "Failed to queue event");
            return;
        }
    };

    tokio::spawn(async move {
        match reply.await {
            Ok(Ok(outcome)) => log_outcome(&conversation_id, kind, &outcome),
            // Already logged by the conversation runtime
            Ok(Err(_)) => {}
            Err(_) => tracing::warn!(conv_id = %conversation_id, "Conversation runtime dropped event"),
        }
    });
}

fn log_outcome(conversation_id: &str, kind: EventKind, outcome: &Outcome) {
    match outcome {
        Outcome::Completed(Some(summary)) => tracing::info!(
            conv_id = %conversation_id,
            car_type = ?summary.car_type,
            car_color = ?summary.car_color,
            photo = summary.photo_status(),
            "Listing completed"
        ),
        Outcome::Completed(None) => tracing::info!(conv_id = %conversation_id, "Dialog cancelled"),
        Outcome::Advanced(state) => tracing::debug!(conv_id = %conversation_id, ?kind, %state, "Dialog advanced"),
        Outcome::Rejected(state) => tracing::info!(conv_id = %conversation_id, ?kind, %state, "Answer rejected"),
        Outcome::Ignored(state) => tracing::debug!(conv_id = %conversation_id, ?kind, %state, "Event ignored"),
    }
}

