//! Revenue ledger queries.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::NaiveDate;
use common::{CinemaId, MovieId};
use event_store::EventStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::bookings::AppState;

#[derive(Serialize)]
pub struct DailyRevenueResponse {
    pub cinema_id: String,
    pub date: String,
    pub ticket_revenue_minor: i64,
    pub combo_revenue_minor: i64,
    pub transactions: i64,
}

#[derive(Serialize)]
pub struct MovieRevenueResponse {
    pub movie_id: String,
    pub cinema_id: String,
    pub date: String,
    pub ticket_revenue_minor: i64,
    pub tickets_sold: i64,
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid date: {e}")))
}

/// GET /revenue/daily/{cinema_id}/{date} — daily ledger entry.
#[tracing::instrument(skip(state))]
pub async fn daily<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((cinema_id, date)): Path<(String, String)>,
) -> Result<Json<DailyRevenueResponse>, ApiError> {
    let cinema_uuid = uuid::Uuid::parse_str(&cinema_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid cinema id: {e}")))?;
    let date = parse_date(&date)?;

    // Catch up so the ledger reflects everything settled so far.
    state
        .projection_processor
        .run_catch_up()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let summary = state
        .daily_revenue
        .summary(CinemaId::from_uuid(cinema_uuid), date)
        .await
        .ok_or_else(|| {
            ApiError::NotFound(format!("No revenue recorded for {cinema_id} on {date}"))
        })?;

    Ok(Json(DailyRevenueResponse {
        cinema_id,
        date: date.to_string(),
        ticket_revenue_minor: summary.ticket_revenue.minor(),
        combo_revenue_minor: summary.combo_revenue.minor(),
        transactions: summary.transactions,
    }))
}

/// GET /revenue/movies/{movie_id}/{cinema_id}/{date} — movie ledger entry.
#[tracing::instrument(skip(state))]
pub async fn movie<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((movie_id, cinema_id, date)): Path<(String, String, String)>,
) -> Result<Json<MovieRevenueResponse>, ApiError> {
    let movie_uuid = uuid::Uuid::parse_str(&movie_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid movie id: {e}")))?;
    let cinema_uuid = uuid::Uuid::parse_str(&cinema_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid cinema id: {e}")))?;
    let date = parse_date(&date)?;

    state
        .projection_processor
        .run_catch_up()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let entry = state
        .movie_revenue
        .revenue(
            MovieId::from_uuid(movie_uuid),
            CinemaId::from_uuid(cinema_uuid),
            date,
        )
        .await
        .ok_or_else(|| {
            ApiError::NotFound(format!("No revenue recorded for movie {movie_id} on {date}"))
        })?;

    Ok(Json(MovieRevenueResponse {
        movie_id,
        cinema_id,
        date: date.to_string(),
        ticket_revenue_minor: entry.ticket_revenue.minor(),
        tickets_sold: entry.tickets_sold,
    }))
}
