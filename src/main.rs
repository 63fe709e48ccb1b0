use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use identity_notification_handler::config::Settings;
use identity_notification_handler::server::{create_app, AppState};
use identity_notification_handler::telemetry::init_telemetry;
use identity_notification_handler::triggers::RedisEventSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing; keep the guard alive until shutdown
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!(
        storage_backend = %settings.storage.backend,
        tenants = settings.tenants.len(),
        "Configuration loaded"
    );

    // Create application state
    let state = AppState::new(settings.clone())?;
    tracing::info!(handler = state.handler.name(), "Application state initialized");

    // Start Redis event subscriber in background
    let redis_subscriber = Arc::new(RedisEventSubscriber::new(
        settings.redis.clone(),
        state.handler.clone(),
    ));
    let shutdown_signal = redis_subscriber.shutdown_signal();

    let redis_handle = if settings.subscriber_enabled() {
        let subscriber = redis_subscriber.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = subscriber.start().await {
                tracing::error!(error = %e, "Redis event subscriber failed");
            }
        }))
    } else {
        tracing::info!(
            storage_backend = %settings.storage.backend,
            "Redis event subscriber disabled"
        );
        None
    };

    let app = create_app(state);

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_signal))
        .await?;

    tracing::info!("Waiting for background tasks to finish...");
    if let Some(handle) = redis_handle {
        let _ = handle.await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Stop the Redis subscriber
    let _ = shutdown_tx.send(());
}
