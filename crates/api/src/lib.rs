//! HTTP API server with observability for the seat-reservation engine.
//!
//! Exposes the booking lifecycle, checkout, the two payment callback
//! sinks, refunds and the ledger/ticket queries, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use chrono::Duration;
use domain::{BookingService, InMemoryCatalog, InMemoryLoyaltyService};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{
    DailyRevenueView, MovieRevenueView, Projection, ProjectionProcessor, TicketsView,
};
use settlement::{
    InMemoryNotifier, InMemoryProcessingLog, SettlementCoordinator, SharedSecretVerifier,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
use routes::bookings::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/bookings", post(routes::bookings::hold::<S>))
        .route("/bookings/{id}", get(routes::bookings::get::<S>))
        .route("/bookings/{id}/cancel", post(routes::bookings::cancel::<S>))
        .route(
            "/bookings/{id}/combos",
            put(routes::bookings::set_combos::<S>),
        )
        .route(
            "/bookings/{id}/points",
            post(routes::bookings::redeem_points::<S>),
        )
        .route(
            "/bookings/{id}/checkout",
            post(routes::payments::checkout::<S>),
        )
        .route("/bookings/{id}/refund", post(routes::payments::refund::<S>))
        .route(
            "/payments/return",
            post(routes::payments::return_callback::<S>),
        )
        .route(
            "/payments/notify",
            post(routes::payments::notify_callback::<S>),
        )
        .route(
            "/screenings/{id}/seats",
            get(routes::screenings::seat_map::<S>),
        )
        .route(
            "/revenue/daily/{cinema_id}/{date}",
            get(routes::revenue::daily::<S>),
        )
        .route(
            "/revenue/movies/{movie_id}/{cinema_id}/{date}",
            get(routes::revenue::movie::<S>),
        )
        .route("/tickets/{code}/checkin", post(routes::tickets::check_in::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state with in-memory boundary services.
///
/// Returns the state, the shared projection processor (for catch-up and
/// the ticket sweeper) and the catalog handle so callers can seed
/// screenings, prices and combos.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
    hold_duration: Duration,
    gateway_secret: &str,
) -> (
    Arc<AppState<S>>,
    Arc<ProjectionProcessor<S>>,
    InMemoryCatalog,
) {
    let catalog = InMemoryCatalog::new();
    let loyalty = InMemoryLoyaltyService::new();
    let notifier = InMemoryNotifier::new();

    let bookings = Arc::new(BookingService::new(
        event_store.clone(),
        catalog.clone(),
        loyalty.clone(),
        hold_duration,
    ));

    let settlement = SettlementCoordinator::new(
        event_store.clone(),
        bookings.clone(),
        loyalty,
        InMemoryProcessingLog::new(),
        notifier,
    );

    let daily_revenue = DailyRevenueView::new();
    let movie_revenue = MovieRevenueView::new();
    let tickets = TicketsView::new();

    let mut processor = ProjectionProcessor::new(event_store.clone());
    processor.register(Box::new(daily_revenue.clone()) as Box<dyn Projection>);
    processor.register(Box::new(movie_revenue.clone()) as Box<dyn Projection>);
    processor.register(Box::new(tickets.clone()) as Box<dyn Projection>);
    let processor = Arc::new(processor);

    let state = Arc::new(AppState {
        bookings,
        settlement,
        verifier: SharedSecretVerifier::new(gateway_secret),
        daily_revenue,
        movie_revenue,
        tickets,
        event_store,
        projection_processor: processor.clone(),
    });

    (state, processor, catalog)
}
