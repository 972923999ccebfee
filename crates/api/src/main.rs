//! API server entry point.

use std::sync::Arc;

use event_store::InMemoryEventStore;
use settlement::{ExpirationSweeper, TicketSweeper};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = api::Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Create event store and application state
    let event_store = InMemoryEventStore::new();
    let (state, processor, _catalog) = api::create_default_state(
        event_store.clone(),
        config.hold_duration(),
        &config.gateway_secret,
    );

    // 4. Bring read models up to date with any existing events
    processor.run_catch_up().await.expect("catch-up failed");

    // 5. Start the background sweepers
    let expiration_sweeper = Arc::new(ExpirationSweeper::new(
        event_store.clone(),
        state.bookings.clone(),
    ));
    let expiration_handle = expiration_sweeper.spawn(config.sweep_interval());

    let ticket_sweeper = Arc::new(TicketSweeper::over(
        state.tickets.clone(),
        processor.clone(),
    ));
    let ticket_handle = ticket_sweeper.spawn(config.sweep_interval());

    // 6. Build and serve the application
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    expiration_handle.abort();
    ticket_handle.abort();
    tracing::info!("server shut down gracefully");
}
