//! Ticket check-in endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::Utc;
use event_store::EventStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::bookings::AppState;

#[derive(Serialize)]
pub struct CheckInResponse {
    pub code: String,
    pub seat_id: String,
    pub booking_id: String,
    pub status: String,
}

/// POST /tickets/{code}/checkin — scan a ticket at the door.
#[tracing::instrument(skip(state))]
pub async fn check_in<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
) -> Result<Json<CheckInResponse>, ApiError> {
    // Catch up so freshly issued tickets are scannable immediately.
    state
        .projection_processor
        .run_catch_up()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let ticket = state
        .tickets
        .mark_used(&code, Utc::now())
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(CheckInResponse {
        code: ticket.code,
        seat_id: ticket.seat_id.to_string(),
        booking_id: ticket.booking_id.to_string(),
        status: ticket.status.to_string(),
    }))
}
